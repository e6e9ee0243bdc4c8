use super::StorageService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockStorageClient {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    base_url: String,
    upload_count: Arc<Mutex<usize>>,
    failure: Option<String>,
}

impl MockStorageClient {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://mock-storage.example.com".to_string(),
            upload_count: Arc::new(Mutex::new(0)),
            failure: None,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Make every upload fail with the given message.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_files(&self) -> HashMap<String, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageClient {
    async fn upload_file(&self, key: &str, data: &[u8], _content_type: &str) -> Result<String> {
        *self.upload_count.lock().unwrap() += 1;

        if let Some(message) = &self.failure {
            return Err(Error::Storage(message.clone()));
        }

        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_storage_upload() {
        let client = MockStorageClient::new();

        let url = client
            .upload_file("dog.png", b"png bytes", "image/png")
            .await
            .unwrap();

        assert_eq!(url, "https://mock-storage.example.com/dog.png");
        assert_eq!(client.get_upload_count(), 1);
        assert_eq!(client.get_files()["dog.png"], b"png bytes".to_vec());
    }

    #[tokio::test]
    async fn test_store_same_name_twice_yields_distinct_urls() {
        let client = MockStorageClient::new().with_base_url("https://bucket.test".to_string());

        let first = client.store(b"one", "dog.png", "image/png").await.unwrap();
        let second = client.store(b"two", "dog.png", "image/png").await.unwrap();

        assert_ne!(first.url, second.url);
        assert_ne!(first.key, second.key);
        assert!(first.url.starts_with("https://bucket.test/"));
        assert_eq!(first.size, 3);
        assert_eq!(client.get_files().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_storage_failure() {
        let client = MockStorageClient::new().with_failure("bucket unreachable");

        let err = client.store(b"data", "a.png", "image/png").await.unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(client.get_files().is_empty());
    }
}
