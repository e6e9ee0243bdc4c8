use super::client::HuggingFaceHttpClient;
use crate::ai::CaptionService;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// One element of the image-to-text task output.
#[derive(Debug, Deserialize)]
struct CaptionCandidate {
    generated_text: String,
}

pub struct HuggingFaceCaptionClient {
    http: HuggingFaceHttpClient,
    model: String,
}

impl HuggingFaceCaptionClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: HuggingFaceHttpClient::new_with_client(api_key, Duration::from_secs(60), client),
            model,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

/// Every element must carry a string `generated_text`; the first one wins.
fn first_caption(body: serde_json::Value) -> Result<String> {
    let candidates: Vec<CaptionCandidate> = serde_json::from_value(body).map_err(|e| {
        tracing::warn!("Caption response did not match expected shape: {}", e);
        Error::Format("Hugging Face caption".to_string())
    })?;

    candidates
        .into_iter()
        .next()
        .map(|candidate| candidate.generated_text)
        .ok_or_else(|| Error::Format("Hugging Face caption".to_string()))
}

#[async_trait]
impl CaptionService for HuggingFaceCaptionClient {
    async fn caption(&self, image_url: &str) -> Result<String> {
        let body = self
            .http
            .infer(&self.model, &serde_json::json!({ "inputs": image_url }))
            .await?;

        let caption = first_caption(body)?;
        tracing::info!("Captioned {}: {}", image_url, caption);
        Ok(caption)
    }
}
