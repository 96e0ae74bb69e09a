//! CDN upload abstraction and the ImageKit implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CoreError;

const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
const DEFAULT_FOLDER: &str = "/reelforge/videos";

/// Result of a finished CDN upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResult {
    pub url: String,
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Size of the uploaded bytes, not the CDN's reported metadata size.
    pub size: u64,
}

/// Trait for CDN storage backends.
#[async_trait]
pub trait CdnUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<UploadResult, CoreError>;
}

/// ImageKit upload API client.
pub struct ImageKitClient {
    client: reqwest::Client,
    private_key: String,
    upload_url: String,
    folder: String,
}

impl ImageKitClient {
    pub fn new(private_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            private_key: private_key.into(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            folder: DEFAULT_FOLDER.to_string(),
        }
    }

    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ImageKitResponse {
    #[serde(rename = "fileId")]
    file_id: String,
    url: String,
    #[serde(rename = "thumbnailUrl", default)]
    thumbnail_url: Option<String>,
    #[serde(rename = "filePath", default)]
    file_path: Option<String>,
}

#[async_trait]
impl CdnUploader for ImageKitClient {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<UploadResult, CoreError> {
        let size = bytes.len() as u64;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("video/mp4")
            .map_err(|e| CoreError::Internal(format!("multipart part: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string())
            .text("folder", self.folder.clone())
            .text("useUniqueFileName", "true")
            .text("tags", "reelforge,ugc-video");

        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("imagekit http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => CoreError::AuthFail(format!("imagekit: {}", body)),
                429 => CoreError::RateLimit(format!("imagekit: {}", body)),
                _ => CoreError::ThirdParty {
                    message: format!("imagekit upload error ({})", status),
                    details: serde_json::json!({ "status": status, "body": body }),
                },
            });
        }

        let parsed: ImageKitResponse = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("imagekit response decode: {}", e)))?;

        info!(
            file_id = %parsed.file_id,
            url = %parsed.url,
            size_bytes = size,
            "video uploaded to cdn"
        );

        Ok(UploadResult {
            url: parsed.url,
            file_id: parsed.file_id,
            thumbnail_url: parsed.thumbnail_url,
            file_path: parsed.file_path,
            size,
        })
    }
}
