//! Data models and structures
//!
//! Defines the domain types that flow through the pipeline (stored images,
//! generation jobs, pipeline reports) and the process-wide configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// An uploaded image once it has been written to object storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// Lifecycle states reported by the image-generation service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "queued")]
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Last observed snapshot of an image-generation job.
///
/// Only ever replaced wholesale by a fresh fetch from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: String,
    pub status: JobStatus,
    pub output: Vec<String>,
    pub error: Option<String>,
}

impl GenerationJob {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            output: Vec::new(),
            error: None,
        }
    }
}

/// One scenario paired with the image generated for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario: String,
    pub generated_image_url: String,
}

/// Everything produced by one end-to-end pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub image: ImageAsset,
    pub caption: String,
    pub results: Vec<ScenarioResult>,
}

// Configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub dry_run: bool,
    pub storage: Option<StorageConfig>,
    pub huggingface_api_key: Option<String>,
    pub caption_model: String,
    pub cohere_api_key: Option<String>,
    pub scenario_model: String,
    pub scenario_count: u32,
    pub scenario_temperature: f32,
    pub scenario_max_tokens: u32,
    pub replicate_api_key: Option<String>,
    pub replicate_model_version: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub poll_fetch_retries: usize,
}

pub const DEFAULT_CAPTION_MODEL: &str = "Salesforce/blip-image-captioning-large";
pub const DEFAULT_SCENARIO_MODEL: &str = "command-xlarge";
pub const DEFAULT_REPLICATE_MODEL_VERSION: &str =
    "0827b64897df7b6e8c04625167bbb275b9db0f14ab09e2454b9824141963c966";

impl Config {
    /// Load configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Credentials are mandatory unless `DRY_RUN` is enabled.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let dry_run = match var("DRY_RUN") {
            Some(value) => parse_bool("DRY_RUN", &value)?,
            None => false,
        };
        let secret = |name: &str| -> Result<Option<String>> {
            match var(name) {
                Some(value) => Ok(Some(value)),
                None if dry_run => Ok(None),
                None => Err(Error::Config(format!("{} not set", name))),
            }
        };

        let storage = match (
            secret("STORAGE_ACCESS_KEY_ID")?,
            secret("STORAGE_SECRET_ACCESS_KEY")?,
            secret("STORAGE_ENDPOINT")?,
            secret("STORAGE_PUBLIC_URL")?,
        ) {
            (Some(access_key_id), Some(secret_access_key), Some(endpoint), Some(public_url)) => {
                Some(StorageConfig {
                    access_key_id,
                    secret_access_key,
                    endpoint,
                    bucket: var("STORAGE_BUCKET").unwrap_or_else(|| "memifybucket".to_string()),
                    region: var("STORAGE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                    public_url: public_url.trim_end_matches('/').to_string(),
                })
            }
            _ => None,
        };

        Ok(Self {
            bind_addr: parse_or(&var, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            dry_run,
            storage,
            huggingface_api_key: secret("HUGGINGFACE_API_KEY")?,
            caption_model: var("CAPTION_MODEL").unwrap_or_else(|| DEFAULT_CAPTION_MODEL.to_string()),
            cohere_api_key: secret("COHERE_API_KEY")?,
            scenario_model: var("SCENARIO_MODEL")
                .unwrap_or_else(|| DEFAULT_SCENARIO_MODEL.to_string()),
            scenario_count: non_zero("SCENARIO_COUNT", parse_or(&var, "SCENARIO_COUNT", 4)?)?,
            scenario_temperature: parse_or(&var, "SCENARIO_TEMPERATURE", 0.7)?,
            scenario_max_tokens: parse_or(&var, "SCENARIO_MAX_TOKENS", 100)?,
            replicate_api_key: secret("REPLICATE_API_KEY")?,
            replicate_model_version: var("REPLICATE_MODEL_VERSION")
                .unwrap_or_else(|| DEFAULT_REPLICATE_MODEL_VERSION.to_string()),
            poll_interval: Duration::from_secs(non_zero(
                "POLL_INTERVAL_SECS",
                parse_or(&var, "POLL_INTERVAL_SECS", 5)?,
            )?),
            poll_timeout: Duration::from_secs(non_zero(
                "POLL_TIMEOUT_SECS",
                parse_or(&var, "POLL_TIMEOUT_SECS", 60)?,
            )?),
            poll_fetch_retries: parse_or(&var, "POLL_FETCH_RETRIES", 2)?,
        })
    }
}

fn parse_or<T, F>(var: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, raw, e))),
        None => Ok(default),
    }
}

fn non_zero<T>(name: &str, value: T) -> Result<T>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        Err(Error::Config(format!("{} must be greater than zero", name)))
    } else {
        Ok(value)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid {} '{}'", name, raw))),
    }
}
