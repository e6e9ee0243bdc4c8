//! Replicate predictions API payloads.

use crate::models::{GenerationJob, JobStatus};
use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/predictions`.
#[derive(Debug, Serialize)]
pub struct PredictionRequest<'a> {
    pub version: &'a str,
    pub input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct PredictionInput<'a> {
    pub image: &'a str,
    pub prompt: &'a str,
}

/// Prediction object returned by both creation and status endpoints.
///
/// `id` and `status` are optional here so a payload missing them can be
/// reported as a protocol failure instead of a decode error.
#[derive(Debug, Deserialize)]
pub struct Prediction {
    pub id: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub output: Option<PredictionOutput>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Models return either a list of file URLs or a single URL.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Many(Vec<String>),
    One(String),
}

impl Prediction {
    /// Convert to the domain job, or `None` when id or status is absent.
    pub fn into_job(self) -> Option<GenerationJob> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let status = self.status?;

        let output = match self.output {
            Some(PredictionOutput::Many(urls)) => urls,
            Some(PredictionOutput::One(url)) => vec![url],
            None => Vec::new(),
        };

        let error = match self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(message)) => Some(message),
            Some(other) => Some(other.to_string()),
        };

        Some(GenerationJob {
            id,
            status,
            output,
            error,
        })
    }
}
