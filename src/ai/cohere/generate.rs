use super::client::CohereHttpClient;
use crate::ai::ScenarioService;
use crate::{prompts, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    num_generations: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Option<Vec<Generation>>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

/// Sampling settings for scenario generation.
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub model: String,
    pub count: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            model: crate::models::DEFAULT_SCENARIO_MODEL.to_string(),
            count: 4,
            temperature: 0.7,
            max_tokens: 100,
        }
    }
}

pub struct CohereScenarioClient {
    http: CohereHttpClient,
    settings: ScenarioSettings,
}

impl CohereScenarioClient {
    pub fn new(api_key: String, settings: ScenarioSettings) -> Self {
        Self::new_with_client(api_key, settings, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        settings: ScenarioSettings,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: CohereHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            settings,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ScenarioService for CohereScenarioClient {
    async fn generate_scenarios(&self, caption: &str) -> Result<Vec<String>> {
        let request = GenerateRequest {
            model: self.settings.model.clone(),
            prompt: prompts::render(prompts::SCENARIO, &[("caption", caption)]),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            num_generations: self.settings.count,
        };

        let response: GenerateResponse = self.http.post("/v1/generate", &request).await?;

        let Some(generations) = response.generations else {
            tracing::warn!("Cohere response carried no generations");
            return Ok(Vec::new());
        };

        let scenarios: Vec<String> = generations
            .into_iter()
            .map(|generation| generation.text.trim().to_string())
            .collect();
        tracing::info!("Generated {} scenarios", scenarios.len());
        Ok(scenarios)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer) -> CohereScenarioClient {
        CohereScenarioClient::new("co-key".to_string(), ScenarioSettings::default())
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_four_scenarios_from_dog_caption() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(header("Authorization", "Bearer co-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "command-xlarge",
                "num_generations": 4,
                "max_tokens": 100
            })))
            .and(body_string_contains(
                r#"Input: \"a dog running on a beach\"\n\nScenario:"#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "gen-1",
                "generations": [
                    { "id": "1", "text": " Make the dog run through fresh snow." },
                    { "id": "2", "text": " Turn the beach into a neon city street." },
                    { "id": "3", "text": " Give the dog a superhero cape." },
                    { "id": "4", "text": " Paint the scene in watercolor.\n" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let scenarios = make_client(&server)
            .generate_scenarios("a dog running on a beach")
            .await
            .unwrap();

        assert_eq!(
            scenarios,
            vec![
                "Make the dog run through fresh snow.",
                "Turn the beach into a neon city street.",
                "Give the dog a superhero cape.",
                "Paint the scene in watercolor.",
            ]
        );
    }

    #[tokio::test]
    async fn test_sends_configured_count_and_temperature() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "command-light",
                "num_generations": 2
            })))
            .and(body_string_contains("\"temperature\":0.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "generations": [{ "text": "a" }, { "text": "b" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = ScenarioSettings {
            model: "command-light".to_string(),
            count: 2,
            temperature: 0.5,
            max_tokens: 100,
        };
        let client = CohereScenarioClient::new("k".to_string(), settings)
            .with_base_url(server.uri());

        let scenarios = client.generate_scenarios("caption").await.unwrap();
        assert_eq!(scenarios.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_generations_yields_empty_list() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "x" })),
            )
            .mount(&server)
            .await;

        let scenarios = make_client(&server)
            .generate_scenarios("a cat")
            .await
            .unwrap();
        assert!(scenarios.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_returns_upstream_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api token"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_scenarios("a cat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UpstreamRejected {
                service: "Cohere",
                status: 401,
                ..
            }
        ));
    }
}
