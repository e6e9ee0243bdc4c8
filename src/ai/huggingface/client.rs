use crate::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Thin client for the Hugging Face serverless Inference API.
pub struct HuggingFaceHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl HuggingFaceHttpClient {
    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Run `model` on `request` and return the raw JSON body.
    ///
    /// The response shape differs per task, so validation is left to callers.
    pub async fn infer<Req: Serialize>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/models/{}", self.base_url, model);
        tracing::debug!("Sending inference request to {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Hugging Face: {}", e);
                e
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Hugging Face API error (status {}): {}", status, body);
            return Err(Error::UpstreamRejected {
                service: "Hugging Face",
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Hugging Face response: {}\nBody: {}", e, body);
            Error::Format("Hugging Face".to_string())
        })
    }
}
