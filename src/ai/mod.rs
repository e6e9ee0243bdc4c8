//! Hosted AI service integrations
//!
//! Each pipeline step is delegated to a hosted model behind a small trait:
//! captioning (Hugging Face BLIP), scenario writing (Cohere) and image-to-image
//! generation (Replicate predictions). Mocks implement the same traits for
//! tests and dry runs.

pub mod cohere;
pub mod huggingface;
pub mod mock;
pub mod replicate;

pub use cohere::{CohereScenarioClient, ScenarioSettings};
pub use huggingface::HuggingFaceCaptionClient;
pub use mock::{MockCaptionClient, MockImageTransformClient, MockScenarioClient};
pub use replicate::ReplicateClient;

use crate::models::GenerationJob;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Describe the image reachable at `image_url`.
    async fn caption(&self, image_url: &str) -> Result<String>;
}

#[async_trait]
pub trait ScenarioService: Send + Sync {
    /// Rewrite a caption into short editing directives, in the order the
    /// model returned them.
    async fn generate_scenarios(&self, caption: &str) -> Result<Vec<String>>;
}

/// Asynchronous image-to-image jobs tracked by an opaque upstream id.
#[async_trait]
pub trait ImageTransformService: Send + Sync {
    async fn submit(&self, image_url: &str, scenario: &str) -> Result<GenerationJob>;
    async fn fetch(&self, job_id: &str) -> Result<GenerationJob>;
}
