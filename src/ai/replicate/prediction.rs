use super::client::ReplicateHttpClient;
use super::types::{Prediction, PredictionInput, PredictionRequest};
use crate::ai::ImageTransformService;
use crate::models::GenerationJob;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, RetryIf};

const FETCH_RETRY_DELAY_MS: u64 = 500;

/// Image-to-image generation through Replicate's predictions API.
pub struct ReplicateClient {
    http: ReplicateHttpClient,
    model_version: String,
    fetch_retries: usize,
}

impl ReplicateClient {
    pub fn new(api_key: String, model_version: String) -> Self {
        Self::new_with_client(api_key, model_version, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model_version: String, client: reqwest::Client) -> Self {
        Self {
            http: ReplicateHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model_version,
            fetch_retries: 0,
        }
    }

    /// Retry status fetches this many times on connection failures.
    ///
    /// Submissions are never retried: a second POST would start a second job.
    pub fn with_fetch_retries(mut self, retries: usize) -> Self {
        self.fetch_retries = retries;
        self
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl ImageTransformService for ReplicateClient {
    async fn submit(&self, image_url: &str, scenario: &str) -> Result<GenerationJob> {
        let prompt = prompts::render(prompts::TRANSFORM, &[("scenario", scenario)]);
        let request = PredictionRequest {
            version: &self.model_version,
            input: PredictionInput {
                image: image_url,
                prompt: &prompt,
            },
        };

        tracing::debug!("Submitting prediction for scenario: {}", scenario);
        let body = self
            .http
            .post("/v1/predictions", &request)
            .await
            .map_err(|e| match e {
                Error::UpstreamRejected {
                    status, message, ..
                } => Error::Submission(format!("status {}: {}", status, message)),
                other => other,
            })?;

        let job = serde_json::from_str::<Prediction>(&body)
            .ok()
            .and_then(Prediction::into_job)
            .ok_or_else(|| {
                tracing::error!("Prediction response missing id or status: {}", body);
                Error::Submission("response missing prediction id or status".to_string())
            })?;

        tracing::info!("Started prediction {} ({})", job.id, job.status);
        Ok(job)
    }

    async fn fetch(&self, job_id: &str) -> Result<GenerationJob> {
        let http = &self.http;
        let path = format!("/v1/predictions/{}", job_id);
        let path = path.as_str();
        let strategy = FixedInterval::from_millis(FETCH_RETRY_DELAY_MS).take(self.fetch_retries);

        let body = RetryIf::start(
            strategy,
            move || http.get(path),
            |e: &Error| {
                let retry = e.is_transient();
                if retry {
                    tracing::warn!("Status fetch for {} failed: {}. Will retry...", job_id, e);
                }
                retry
            },
        )
        .await?;

        let prediction: Prediction = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Replicate prediction: {}\nBody: {}", e, body);
            Error::Format("Replicate prediction".to_string())
        })?;

        prediction
            .into_job()
            .ok_or_else(|| Error::Format("Replicate prediction".to_string()))
    }
}
