//! Veo video generation client (Google long-running operations API).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CoreError;

use super::types::{PollStatus, SubmitOptions, VideoGenerator, VideoProviderKind};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Veo `predictLongRunning` endpoint.
#[derive(Debug)]
pub struct VeoClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl VeoClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(600))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct VeoOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<VeoOperationResponse>,
    #[serde(default)]
    error: Option<VeoOperationError>,
}

#[derive(Debug, Deserialize)]
struct VeoOperationResponse {
    #[serde(rename = "generateVideoResponse", default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
struct VeoGenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    generated_samples: Vec<VeoSample>,
}

#[derive(Debug, Deserialize)]
struct VeoSample {
    #[serde(default)]
    video: Option<VeoVideoInfo>,
}

#[derive(Debug, Deserialize)]
struct VeoVideoInfo {
    #[serde(default)]
    uri: Option<String>,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeoOperationError {
    #[serde(default)]
    message: String,
}

fn veo_api_error(status: u16, body: String) -> CoreError {
    match status {
        401 | 403 => CoreError::AuthFail(format!("veo: {}", body)),
        429 => CoreError::RateLimit(format!("veo: {}", body)),
        _ => CoreError::ThirdParty {
            message: format!("veo api error ({})", status),
            details: serde_json::json!({ "status": status, "body": body }),
        },
    }
}

#[async_trait]
impl VideoGenerator for VeoClient {
    fn provider(&self) -> VideoProviderKind {
        VideoProviderKind::Veo31
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> Result<String, CoreError> {
        // The REST surface only accepts the prompt. Aspect ratio and
        // resolution intent are logged so the submission is traceable.
        debug!(
            aspect_ratio = options.aspect_ratio.as_str(),
            resolution = options.resolution.as_str(),
            prompt_length = prompt.len(),
            "submitting veo video"
        );

        let payload = serde_json::json!({
            "instances": [{ "prompt": prompt }]
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:predictLongRunning",
                self.api_base,
                VideoProviderKind::Veo31.model()
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("veo http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(veo_api_error(status, body));
        }

        let operation: VeoOperation = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("veo response decode: {}", e)))?;

        if operation.name.is_empty() {
            return Err(CoreError::third_party(
                "veo response missing operation name",
            ));
        }

        info!(operation_id = %operation.name, "veo video submitted");
        Ok(operation.name)
    }

    async fn poll(&self, operation_id: &str) -> Result<PollStatus, CoreError> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_base, operation_id))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("veo http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(veo_api_error(status, body));
        }

        let operation: VeoOperation = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("veo response decode: {}", e)))?;

        if !operation.done {
            return Ok(PollStatus {
                done: false,
                status: "processing".to_string(),
                ..Default::default()
            });
        }

        if let Some(error) = operation.error {
            return Ok(PollStatus {
                done: true,
                status: "failed".to_string(),
                error: Some(error.message),
                ..Default::default()
            });
        }

        let sample = operation
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next());
        let video = sample.and_then(|s| s.video);

        match video.as_ref().and_then(|v| v.uri.clone()) {
            Some(uri) => Ok(PollStatus {
                done: true,
                status: "completed".to_string(),
                progress: None,
                asset_ref: Some(uri.clone()),
                error: None,
                metadata: serde_json::json!({
                    "video_uri": uri,
                    "mime_type": video.and_then(|v| v.mime_type),
                }),
            }),
            None => Ok(PollStatus {
                done: true,
                status: "failed".to_string(),
                error: Some("veo operation finished without a video uri".to_string()),
                ..Default::default()
            }),
        }
    }

    async fn download(&self, asset_ref: &str) -> Result<Vec<u8>, CoreError> {
        let response = self
            .client
            .get(asset_ref)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("veo http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(veo_api_error(status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::third_party(format!("veo download read: {}", e)))?;

        info!(size_bytes = bytes.len(), "veo video downloaded");
        Ok(bytes.to_vec())
    }
}
