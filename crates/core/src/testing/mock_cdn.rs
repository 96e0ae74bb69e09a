//! Mock CDN uploader for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::cdn::{CdnUploader, UploadResult};
use crate::error::CoreError;

/// Mock implementation of the [`CdnUploader`] trait.
///
/// Uploads always succeed and are recorded as (file_name, byte_count) pairs.
/// An injected error makes every upload fail instead.
pub struct MockCdnUploader {
    uploads: Mutex<Vec<(String, usize)>>,
    error: Option<CoreError>,
}

impl Default for MockCdnUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCdnUploader {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            error: None,
        }
    }

    /// Error returned by every `upload`.
    pub fn with_error(mut self, error: CoreError) -> Self {
        self.error = Some(error);
        self
    }

    /// Recorded (file_name, byte_count) pairs in upload order.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CdnUploader for MockCdnUploader {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<UploadResult, CoreError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let size = bytes.len() as u64;
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes.len()));
        Ok(UploadResult {
            url: format!("https://cdn.example.com/videos/{}", file_name),
            file_id: format!("mock-file-{}", file_name),
            thumbnail_url: Some(format!(
                "https://cdn.example.com/thumbnails/{}.png",
                file_name
            )),
            file_path: Some(format!("/reelforge/videos/{}", file_name)),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_records_name_and_size() {
        let cdn = MockCdnUploader::new();
        let result = cdn.upload(vec![0u8; 32], "post_abc.mp4").await.unwrap();

        assert_eq!(result.size, 32);
        assert!(result.url.ends_with("post_abc.mp4"));
        assert_eq!(cdn.uploads(), vec![("post_abc.mp4".to_string(), 32)]);
    }

    #[tokio::test]
    async fn test_injected_error_fails_upload() {
        let cdn = MockCdnUploader::new().with_error(CoreError::third_party("cdn outage"));
        let err = cdn.upload(vec![1], "f.mp4").await.unwrap_err();
        assert_eq!(err.code(), "third_party_fail");
    }
}
