//! Pipeline orchestration: upload, caption, scenarios, image generation.

use crate::ai::{
    CaptionService, CohereScenarioClient, HuggingFaceCaptionClient, ImageTransformService,
    MockCaptionClient, MockImageTransformClient, MockScenarioClient, ReplicateClient,
    ScenarioService, ScenarioSettings,
};
use crate::job::{Clock, JobRunner, PollPolicy, TokioClock};
use crate::models::{Config, ImageAsset, PipelineReport, ScenarioResult};
use crate::storage::{MockStorageClient, S3StorageClient, StorageService};
use crate::{upload, Error, Result};
use futures::future::try_join_all;
use tracing::{error, info};

/// Owns one instance of every external service and sequences them.
pub struct App {
    storage: Box<dyn StorageService>,
    caption: Box<dyn CaptionService>,
    scenarios: Box<dyn ScenarioService>,
    transform: Box<dyn ImageTransformService>,
    clock: Box<dyn Clock>,
    poll: PollPolicy,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub storage: Box<dyn StorageService>,
    pub caption: Box<dyn CaptionService>,
    pub scenarios: Box<dyn ScenarioService>,
    pub transform: Box<dyn ImageTransformService>,
    pub clock: Box<dyn Clock>,
}

/// Reject blank input. The value itself is passed on untouched.
fn require<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(Error::Validation(message.to_string()))
    } else {
        Ok(value)
    }
}

fn missing(name: &str) -> Error {
    Error::Config(format!("{} not set", name))
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, poll: PollPolicy) -> Self {
        Self {
            storage: services.storage,
            caption: services.caption,
            scenarios: services.scenarios,
            transform: services.transform,
            clock: services.clock,
            poll,
        }
    }

    /// Construct every client from configuration, once, at startup.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let poll = PollPolicy {
            interval: config.poll_interval,
            timeout: config.poll_timeout,
        };

        if config.dry_run {
            info!("DRY_RUN enabled: all external services are mocked");
            return Ok(Self::with_services(
                AppServices {
                    storage: Box::new(MockStorageClient::new()),
                    caption: Box::new(MockCaptionClient::new()),
                    scenarios: Box::new(MockScenarioClient::new(config.scenario_count as usize)),
                    transform: Box::new(MockImageTransformClient::new()),
                    clock: Box::new(TokioClock::new()),
                },
                poll,
            ));
        }

        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        let storage_config = config
            .storage
            .as_ref()
            .ok_or_else(|| missing("STORAGE_*"))?;
        let storage = S3StorageClient::new(storage_config).await?;
        info!(
            "Storage: bucket {} via {}",
            storage_config.bucket, storage_config.endpoint
        );

        let caption = HuggingFaceCaptionClient::new_with_client(
            config
                .huggingface_api_key
                .clone()
                .ok_or_else(|| missing("HUGGINGFACE_API_KEY"))?,
            config.caption_model.clone(),
            http_client.clone(),
        );
        info!("Caption provider: Hugging Face (model: {})", config.caption_model);

        let scenarios = CohereScenarioClient::new_with_client(
            config
                .cohere_api_key
                .clone()
                .ok_or_else(|| missing("COHERE_API_KEY"))?,
            ScenarioSettings {
                model: config.scenario_model.clone(),
                count: config.scenario_count,
                temperature: config.scenario_temperature,
                max_tokens: config.scenario_max_tokens,
            },
            http_client.clone(),
        );
        info!(
            "Scenario provider: Cohere (model: {}, {} generations)",
            config.scenario_model, config.scenario_count
        );

        let transform = ReplicateClient::new_with_client(
            config
                .replicate_api_key
                .clone()
                .ok_or_else(|| missing("REPLICATE_API_KEY"))?,
            config.replicate_model_version.clone(),
            http_client,
        )
        .with_fetch_retries(config.poll_fetch_retries);
        info!(
            "Image provider: Replicate (version: {}, poll every {:?}, give up after {:?})",
            config.replicate_model_version, poll.interval, poll.timeout
        );

        Ok(Self::with_services(
            AppServices {
                storage: Box::new(storage),
                caption: Box::new(caption),
                scenarios: Box::new(scenarios),
                transform: Box::new(transform),
                clock: Box::new(TokioClock::new()),
            },
            poll,
        ))
    }

    pub async fn upload_image(&self, data: &[u8], file_name: &str) -> Result<ImageAsset> {
        let content_type = upload::detect_image_mime(data)?;
        self.storage.store(data, file_name, content_type).await
    }

    pub async fn describe_image(&self, image_url: &str) -> Result<String> {
        let image_url = require(image_url, "Image URL is required")?;
        self.caption.caption(image_url).await
    }

    pub async fn generate_scenarios(&self, caption: &str) -> Result<Vec<String>> {
        let caption = require(caption, "Prompt is required")?;
        self.scenarios.generate_scenarios(caption).await
    }

    /// Run one image-generation job to completion.
    pub async fn transform_image(&self, image_url: &str, scenario: &str) -> Result<String> {
        let message = "Both imageUrl and scenario are required";
        let image_url = require(image_url, message)?;
        let scenario = require(scenario, message)?;

        JobRunner::new(self.transform.as_ref(), self.clock.as_ref(), self.poll)
            .run(image_url, scenario)
            .await
    }

    /// Run one job per scenario concurrently.
    ///
    /// Results line up with `scenarios` by index. The first failure fails the
    /// whole batch; remaining jobs stop being polled.
    pub async fn transform_all(&self, image_url: &str, scenarios: &[String]) -> Result<Vec<String>> {
        info!("Generating {} images", scenarios.len());
        try_join_all(
            scenarios
                .iter()
                .map(|scenario| self.transform_image(image_url, scenario)),
        )
        .await
        .map_err(|e| {
            error!("Image batch aborted: {}", e);
            e
        })
    }

    /// Full pipeline for one image, in the same order as the web UI.
    pub async fn run(&self, data: &[u8], file_name: &str) -> Result<PipelineReport> {
        let image = self.upload_image(data, file_name).await?;
        info!("Uploaded {} to {}", file_name, image.url);

        let caption = self.describe_image(&image.url).await?;
        info!("Caption: {}", caption);

        let scenarios = self.generate_scenarios(&caption).await?;
        for (index, scenario) in scenarios.iter().enumerate() {
            info!("Scenario {}: {}", index + 1, scenario);
        }

        let urls = self.transform_all(&image.url, &scenarios).await?;
        let results = scenarios
            .into_iter()
            .zip(urls)
            .map(|(scenario, generated_image_url)| ScenarioResult {
                scenario,
                generated_image_url,
            })
            .collect();

        Ok(PipelineReport {
            image,
            caption,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices};
    use crate::ai::{MockCaptionClient, MockImageTransformClient, MockScenarioClient};
    use crate::job::{ManualClock, PollPolicy};
    use crate::models::JobStatus;
    use crate::storage::MockStorageClient;
    use crate::Error;
    use pretty_assertions::assert_eq;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn build_test_app(
        storage: MockStorageClient,
        scenarios: MockScenarioClient,
        transform: MockImageTransformClient,
    ) -> App {
        App::with_services(
            AppServices {
                storage: Box::new(storage),
                caption: Box::new(MockCaptionClient::new()),
                scenarios: Box::new(scenarios),
                transform: Box::new(transform),
                clock: Box::new(ManualClock::new()),
            },
            PollPolicy::default(),
        )
    }

    fn scenarios(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_sequences_whole_pipeline() {
        let transform = MockImageTransformClient::new();
        let handle = transform.clone();
        let storage = MockStorageClient::new();
        let storage_handle = storage.clone();

        let app = build_test_app(storage, MockScenarioClient::new(4), transform);
        let report = app.run(&PNG_HEADER, "dog.png").await.unwrap();

        assert_eq!(report.caption, "a dog running on a beach");
        assert_eq!(report.image.content_type, "image/png");
        assert_eq!(report.results.len(), 4);
        for result in &report.results {
            assert!(result.scenario.contains("a dog running on a beach"));
            assert_eq!(result.generated_image_url, handle.output_url_for(&result.scenario));
        }
        assert_eq!(handle.get_submit_count(), 4);
        assert_eq!(storage_handle.get_upload_count(), 1);
    }

    #[tokio::test]
    async fn test_transform_all_preserves_scenario_order() {
        // The first scenario finishes last
        let transform = MockImageTransformClient::new().with_statuses_for(
            "slow",
            vec![
                JobStatus::Processing,
                JobStatus::Processing,
                JobStatus::Processing,
                JobStatus::Succeeded,
            ],
        );
        let handle = transform.clone();
        let app = build_test_app(MockStorageClient::new(), MockScenarioClient::new(0), transform);

        let items = scenarios(&["slow snow", "fast rain", "fast fog"]);
        let urls = app.transform_all("https://img.test/a.png", &items).await.unwrap();

        let expected: Vec<String> = items.iter().map(|s| handle.output_url_for(s)).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_transform_all_fails_whole_batch() {
        let transform =
            MockImageTransformClient::new().with_statuses_for("cape", vec![JobStatus::Failed]);
        let app = build_test_app(MockStorageClient::new(), MockScenarioClient::new(0), transform);

        let items = scenarios(&["snow", "a superhero cape", "watercolor"]);
        let err = app
            .transform_all("https://img.test/a.png", &items)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_inputs_never_reach_upstream() {
        let transform = MockImageTransformClient::new();
        let handle = transform.clone();
        let app = build_test_app(MockStorageClient::new(), MockScenarioClient::new(4), transform);

        let err = app.transform_image("", "Make it snow").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = app.transform_image("https://img.test/a.png", "  ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert_eq!(handle.get_submit_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_is_forwarded_verbatim() {
        let transform = MockImageTransformClient::new();
        let handle = transform.clone();
        let app = build_test_app(MockStorageClient::new(), MockScenarioClient::new(4), transform);

        let url = app
            .transform_image("https://img.test/a.png", "  Make it snow ")
            .await
            .unwrap();

        assert_eq!(url, handle.output_url_for("  Make it snow "));
        assert_ne!(url, handle.output_url_for("Make it snow"));
    }

    #[tokio::test]
    async fn test_storage_failure_stops_pipeline() {
        let scenario_client = MockScenarioClient::new(4);
        let scenario_handle = scenario_client.clone();
        let app = build_test_app(
            MockStorageClient::new().with_failure("bucket unreachable"),
            scenario_client,
            MockImageTransformClient::new(),
        );

        let err = app.run(&PNG_HEADER, "dog.png").await.unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(scenario_handle.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_image_upload_is_rejected_before_storage() {
        let storage = MockStorageClient::new();
        let handle = storage.clone();
        let app = build_test_app(storage, MockScenarioClient::new(4), MockImageTransformClient::new());

        let err = app.upload_image(b"not an image", "notes.txt").await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(handle.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_run_with_no_scenarios_returns_empty_results() {
        let app = build_test_app(
            MockStorageClient::new(),
            MockScenarioClient::new(4).with_scenarios(Vec::new()),
            MockImageTransformClient::new(),
        );

        let report = app.run(&PNG_HEADER, "dog.png").await.unwrap();
        assert!(report.results.is_empty());
    }
}
