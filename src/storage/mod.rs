//! Object storage for uploaded images
//!
//! Uploads user images to an S3-compatible bucket (Supabase Storage) and hands
//! back the public URL the captioning and generation services fetch from.

pub mod client;
pub mod mock;

pub use client::S3StorageClient;
pub use mock::MockStorageClient;

use crate::models::ImageAsset;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Write `data` under `key` and return its public URL.
    async fn upload_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;

    /// Store an uploaded file under a fresh, collision-resistant key.
    async fn store(&self, data: &[u8], file_name: &str, content_type: &str) -> Result<ImageAsset> {
        let key = object_key(file_name, Utc::now());
        let url = self.upload_file(&key, data, content_type).await?;
        tracing::info!("Stored {} ({} bytes) at {}", key, data.len(), url);

        Ok(ImageAsset {
            key,
            url,
            content_type: content_type.to_string(),
            size: data.len(),
        })
    }
}

/// Build `<millis>-<random>-<name>` so identical names never overwrite each other.
pub fn object_key(file_name: &str, now: DateTime<Utc>) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        now.timestamp_millis(),
        &nonce[..8],
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_object_key_keeps_timestamp_and_name() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let key = object_key("dog.png", now);

        assert!(key.starts_with("1700000000123-"));
        assert!(key.ends_with("-dog.png"));
    }

    #[test]
    fn test_object_key_differs_for_same_name_and_instant() {
        let now = Utc::now();
        assert_ne!(object_key("dog.png", now), object_key("dog.png", now));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my dog.jpg"), "my-dog.jpg");
        assert_eq!(sanitize_file_name("plage été.png"), "plage--t-.png");
        assert_eq!(sanitize_file_name(""), "image");
        assert_eq!(sanitize_file_name(".."), "image");
    }
}
