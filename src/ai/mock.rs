use super::{CaptionService, ImageTransformService, ScenarioService};
use crate::models::{GenerationJob, JobStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const DEFAULT_CAPTION: &str = "a dog running on a beach";

fn mock_failure(service: &'static str, message: &str) -> Error {
    Error::UpstreamRejected {
        service,
        status: 500,
        message: message.to_string(),
    }
}

#[derive(Clone)]
pub struct MockCaptionClient {
    responses: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
    call_count: Arc<Mutex<usize>>,
}

impl MockCaptionClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_caption_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockCaptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionService for MockCaptionClient {
    async fn caption(&self, _image_url: &str) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        if let Some(message) = &self.failure {
            return Err(mock_failure("Mock caption", message));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(DEFAULT_CAPTION.to_string())
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockScenarioClient {
    count: usize,
    fixed: Option<Vec<String>>,
    failure: Option<String>,
    call_count: Arc<Mutex<usize>>,
}

impl MockScenarioClient {
    /// Produces `count` numbered variations of whatever caption it is given.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            fixed: None,
            failure: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_scenarios(mut self, scenarios: Vec<String>) -> Self {
        self.fixed = Some(scenarios);
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockScenarioClient {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl ScenarioService for MockScenarioClient {
    async fn generate_scenarios(&self, caption: &str) -> Result<Vec<String>> {
        *self.call_count.lock().unwrap() += 1;

        if let Some(message) = &self.failure {
            return Err(mock_failure("Mock scenario", message));
        }

        Ok(match &self.fixed {
            Some(scenarios) => scenarios.clone(),
            None => (1..=self.count)
                .map(|i| format!("Variation {}: {}", i, caption))
                .collect(),
        })
    }
}

struct MockJob {
    scenario: String,
    polls: usize,
}

/// Scripted prediction service.
///
/// Every fetch advances a job one step through its status script; once the
/// script is exhausted the last status repeats. Jobs whose scenario contains
/// an override key follow that override's script instead.
#[derive(Clone)]
pub struct MockImageTransformClient {
    base_url: String,
    initial_status: JobStatus,
    script: Vec<JobStatus>,
    overrides: Vec<(String, Vec<JobStatus>)>,
    omit_output: bool,
    submit_failure: Option<String>,
    jobs: Arc<Mutex<HashMap<String, MockJob>>>,
    submit_count: Arc<Mutex<usize>>,
    fetch_count: Arc<Mutex<usize>>,
}

impl MockImageTransformClient {
    pub fn new() -> Self {
        Self {
            base_url: "https://mock-replicate.example.com".to_string(),
            initial_status: JobStatus::Starting,
            script: vec![JobStatus::Processing, JobStatus::Succeeded],
            overrides: Vec::new(),
            omit_output: false,
            submit_failure: None,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            submit_count: Arc::new(Mutex::new(0)),
            fetch_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_initial_status(mut self, status: JobStatus) -> Self {
        self.initial_status = status;
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<JobStatus>) -> Self {
        self.script = statuses;
        self
    }

    pub fn with_statuses_for(mut self, scenario_contains: &str, statuses: Vec<JobStatus>) -> Self {
        self.overrides
            .push((scenario_contains.to_string(), statuses));
        self
    }

    /// Report `succeeded` without any output URLs.
    pub fn without_output(mut self) -> Self {
        self.omit_output = true;
        self
    }

    pub fn with_submit_failure(mut self, message: &str) -> Self {
        self.submit_failure = Some(message.to_string());
        self
    }

    pub fn get_submit_count(&self) -> usize {
        *self.submit_count.lock().unwrap()
    }

    pub fn get_fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }

    /// URL the mock reports for a finished job of `scenario`.
    pub fn output_url_for(&self, scenario: &str) -> String {
        let slug: String = scenario
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}/{}.png", self.base_url, slug)
    }

    fn script_for(&self, scenario: &str) -> &[JobStatus] {
        self.overrides
            .iter()
            .find(|(key, _)| scenario.contains(key.as_str()))
            .map(|(_, statuses)| statuses.as_slice())
            .unwrap_or(self.script.as_slice())
    }

    fn snapshot(&self, id: &str, scenario: &str, status: JobStatus) -> GenerationJob {
        let mut job = GenerationJob::new(id, status);
        match status {
            JobStatus::Succeeded if !self.omit_output => {
                job.output = vec![self.output_url_for(scenario)];
            }
            JobStatus::Failed => job.error = Some("mock generation failed".to_string()),
            _ => {}
        }
        job
    }
}

impl Default for MockImageTransformClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageTransformService for MockImageTransformClient {
    async fn submit(&self, _image_url: &str, scenario: &str) -> Result<GenerationJob> {
        let id = {
            let mut count = self.submit_count.lock().unwrap();
            *count += 1;
            format!("mock-{}", *count)
        };

        if let Some(message) = &self.submit_failure {
            return Err(Error::Submission(message.clone()));
        }

        self.jobs.lock().unwrap().insert(
            id.clone(),
            MockJob {
                scenario: scenario.to_string(),
                polls: 0,
            },
        );
        Ok(self.snapshot(&id, scenario, self.initial_status))
    }

    async fn fetch(&self, job_id: &str) -> Result<GenerationJob> {
        *self.fetch_count.lock().unwrap() += 1;

        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(job_id).ok_or_else(|| Error::UpstreamRejected {
            service: "Mock replicate",
            status: 404,
            message: format!("Unknown prediction {}", job_id),
        })?;

        let script = self.script_for(&job.scenario);
        let status = script
            .get(job.polls)
            .or_else(|| script.last())
            .copied()
            .unwrap_or(JobStatus::Processing);
        job.polls += 1;

        Ok(self.snapshot(job_id, &job.scenario, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_caption_default_and_cycling() {
        let client = MockCaptionClient::new();
        assert_eq!(client.caption("u").await.unwrap(), DEFAULT_CAPTION);

        let client = MockCaptionClient::new()
            .with_caption_response("first".to_string())
            .with_caption_response("second".to_string());
        assert_eq!(client.caption("u").await.unwrap(), "first");
        assert_eq!(client.caption("u").await.unwrap(), "second");
        assert_eq!(client.caption("u").await.unwrap(), "first");
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_scenarios_embed_caption() {
        let client = MockScenarioClient::new(3);
        let scenarios = client.generate_scenarios("a red bicycle").await.unwrap();

        assert_eq!(scenarios.len(), 3);
        assert!(scenarios.iter().all(|s| s.contains("a red bicycle")));
    }

    #[tokio::test]
    async fn test_mock_transform_follows_script() {
        let client = MockImageTransformClient::new();

        let job = client.submit("u", "Make it snow").await.unwrap();
        assert_eq!(job.status, JobStatus::Starting);

        let first = client.fetch(&job.id).await.unwrap();
        assert_eq!(first.status, JobStatus::Processing);

        let second = client.fetch(&job.id).await.unwrap();
        assert_eq!(second.status, JobStatus::Succeeded);
        assert_eq!(second.output, vec![client.output_url_for("Make it snow")]);

        // Script exhausted: the terminal status repeats
        let third = client.fetch(&job.id).await.unwrap();
        assert_eq!(third.status, JobStatus::Succeeded);
        assert_eq!(client.get_fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_transform_override_and_unknown_job() {
        let client = MockImageTransformClient::new()
            .with_statuses_for("cape", vec![JobStatus::Failed]);

        let job = client.submit("u", "Give the dog a cape").await.unwrap();
        let fetched = client.fetch(&job.id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert!(fetched.error.is_some());

        assert!(client.fetch("nope").await.is_err());
    }
}
