//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Every variant maps onto an HTTP status so handlers can return `Result`
//! directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{service} API error (status {status}): {message}")]
    UpstreamRejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Unexpected {0} response format")]
    Format(String),

    #[error("Failed to start image generation: {0}")]
    Submission(String),

    #[error("Image generation failed: {0}")]
    GenerationFailed(String),

    #[error("Image generation did not complete successfully")]
    GenerationIncomplete,

    #[error("Image generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Connection failures and request timeouts, as opposed to an upstream
    /// answering with an error.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
