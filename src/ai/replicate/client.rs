use crate::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

pub struct ReplicateHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl ReplicateHttpClient {
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

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// POST a JSON body and return the raw response text.
    pub async fn post<Req: Serialize>(&self, path: &str, request: &Req) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        self.execute(self.client.post(&url).json(request)).await
    }

    pub async fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        self.execute(self.client.get(&url)).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let response = request
            .timeout(self.timeout)
            .header("Authorization", format!("Token {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Replicate: {}", e);
                e
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Replicate API error (status {}): {}", status, body);
            return Err(Error::UpstreamRejected {
                service: "Replicate",
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }
}
