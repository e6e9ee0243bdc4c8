pub mod client;
pub mod generate;

pub use client::CohereHttpClient;
pub use generate::{CohereScenarioClient, ScenarioSettings};
