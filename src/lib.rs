//! Memify - turn one photo into several AI-edited variations
//!
//! An uploaded image is stored in an S3-compatible bucket, captioned by a
//! hosted vision model, rewritten into short editing scenarios by a text
//! model, and finally run through a hosted image-to-image model once per
//! scenario.

pub mod ai;
pub mod app;
pub mod error;
pub mod job;
pub mod models;
pub mod prompts;
pub mod server;
pub mod storage;
pub mod upload;

pub use error::{Error, Result};
