//! Short-polling driver for image-generation jobs.
//!
//! A job moves `Submitted -> Polling -> {Succeeded, Failed, Incomplete,
//! TimedOut}`. Status only ever changes by fetching it from the service; the
//! runner never assumes a transition. Time is read through [`Clock`] so the
//! timeout can be exercised without real delays.

use crate::ai::ImageTransformService;
use crate::models::{GenerationJob, JobStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Monotonic time source plus the suspension primitive used between polls.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time on the tokio timer.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock whose `sleep` returns immediately after advancing time.
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<usize>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }

    pub fn get_sleep_count(&self) -> usize {
        *self.sleeps.lock().unwrap()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        *self.sleeps.lock().unwrap() += 1;
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Submitted {
        job: GenerationJob,
        at: Duration,
    },
    Polling {
        job: GenerationJob,
        started: Duration,
    },
    Succeeded {
        job_id: String,
        image_url: String,
    },
    Failed {
        job_id: String,
        reason: String,
    },
    Incomplete {
        job_id: String,
    },
    TimedOut {
        job_id: String,
        elapsed: Duration,
    },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Submitted { .. } | JobState::Polling { .. })
    }

    /// Collapse a terminal state into the caller-facing outcome.
    pub fn into_result(self) -> Result<String> {
        match self {
            JobState::Succeeded { image_url, .. } => Ok(image_url),
            JobState::Failed { reason, .. } => Err(Error::GenerationFailed(reason)),
            JobState::Incomplete { .. } => Err(Error::GenerationIncomplete),
            JobState::TimedOut { elapsed, .. } => Err(Error::Timeout(elapsed)),
            JobState::Submitted { job, .. } | JobState::Polling { job, .. } => Err(Error::Invariant(
                format!("job {} is still {}", job.id, job.status),
            )),
        }
    }

    /// Map a freshly observed snapshot onto the next state.
    fn classify(job: GenerationJob, started: Duration) -> Self {
        match job.status {
            JobStatus::Succeeded => match job.output.into_iter().next() {
                Some(image_url) if !image_url.trim().is_empty() => JobState::Succeeded {
                    job_id: job.id,
                    image_url,
                },
                _ => JobState::Incomplete { job_id: job.id },
            },
            JobStatus::Failed | JobStatus::Canceled => JobState::Failed {
                reason: job.error.unwrap_or_else(|| job.status.to_string()),
                job_id: job.id,
            },
            JobStatus::Starting | JobStatus::Processing => JobState::Polling { job, started },
        }
    }
}

/// Drives one job from submission to a terminal state.
pub struct JobRunner<'a> {
    service: &'a dyn ImageTransformService,
    clock: &'a dyn Clock,
    policy: PollPolicy,
}

impl<'a> JobRunner<'a> {
    pub fn new(
        service: &'a dyn ImageTransformService,
        clock: &'a dyn Clock,
        policy: PollPolicy,
    ) -> Self {
        Self {
            service,
            clock,
            policy,
        }
    }

    /// Submit a job and poll it until it succeeds, fails or runs out of time.
    pub async fn run(&self, image_url: &str, scenario: &str) -> Result<String> {
        let mut state = self.submit(image_url, scenario).await?;
        while !state.is_terminal() {
            state = self.step(state).await?;
        }

        match &state {
            JobState::Succeeded { job_id, image_url } => {
                tracing::info!("Job {} succeeded: {}", job_id, image_url)
            }
            JobState::TimedOut { job_id, elapsed } => tracing::warn!(
                "Job {} still running after {:?}; abandoning it",
                job_id,
                elapsed
            ),
            other => tracing::warn!("Job ended unsuccessfully: {:?}", other),
        }
        state.into_result()
    }

    pub async fn submit(&self, image_url: &str, scenario: &str) -> Result<JobState> {
        let job = self.service.submit(image_url, scenario).await?;
        Ok(JobState::Submitted {
            job,
            at: self.clock.now(),
        })
    }

    /// Advance a state by one transition. Terminal states are returned as-is.
    pub async fn step(&self, state: JobState) -> Result<JobState> {
        match state {
            JobState::Submitted { job, at } => Ok(JobState::classify(job, at)),
            JobState::Polling { job, started } => {
                let elapsed = self.clock.now().saturating_sub(started);
                if elapsed >= self.policy.timeout {
                    return Ok(JobState::TimedOut {
                        job_id: job.id,
                        elapsed,
                    });
                }

                // A single fetch may not outlive the remaining budget
                let remaining = self.policy.timeout - elapsed;
                let outcome = tokio::time::timeout(remaining, self.service.fetch(&job.id)).await;
                let fetched = match outcome {
                    Ok(fetched) => fetched?,
                    Err(_) => {
                        return Ok(JobState::TimedOut {
                            job_id: job.id,
                            elapsed: self
                                .clock
                                .now()
                                .saturating_sub(started)
                                .max(self.policy.timeout),
                        })
                    }
                };
                tracing::debug!("Job {} is {}", fetched.id, fetched.status);

                let next = JobState::classify(fetched, started);
                if !next.is_terminal() {
                    self.clock.sleep(self.policy.interval).await;
                }
                Ok(next)
            }
            terminal => Ok(terminal),
        }
    }
}
