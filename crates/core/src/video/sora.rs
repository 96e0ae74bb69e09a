//! Sora video generation client (OpenAI Videos API).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreError;

use super::types::{PollStatus, SubmitOptions, VideoGenerator, VideoProviderKind};

/// Client for the `/v1/videos` endpoints.
#[derive(Debug)]
pub struct SoraClient {
    client: reqwest::Client,
    api_key: String,
    kind: VideoProviderKind,
    api_base: String,
}

impl SoraClient {
    pub fn new(api_key: impl Into<String>, kind: VideoProviderKind) -> Self {
        Self {
            // Downloads of finished clips can take minutes.
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(600))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            kind,
            api_base: "https://api.openai.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[derive(Debug, Serialize)]
struct SoraSubmitRequest {
    model: String,
    prompt: String,
    seconds: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SoraVideo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    error: Option<SoraError>,
    #[serde(default)]
    seconds: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SoraError {
    #[serde(default)]
    message: String,
}

fn sora_api_error(status: u16, body: String) -> CoreError {
    match status {
        401 | 403 => CoreError::AuthFail(format!("sora: {}", body)),
        429 => CoreError::RateLimit(format!("sora: {}", body)),
        _ => CoreError::ThirdParty {
            message: format!("sora api error ({})", status),
            details: serde_json::json!({ "status": status, "body": body }),
        },
    }
}

#[async_trait]
impl VideoGenerator for SoraClient {
    fn provider(&self) -> VideoProviderKind {
        self.kind
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> Result<String, CoreError> {
        let request = SoraSubmitRequest {
            model: self.kind.model().to_string(),
            prompt: prompt.to_string(),
            seconds: options.seconds.to_string(),
            size: Some(options.size().to_string()),
        };

        debug!(
            model = self.kind.model(),
            seconds = options.seconds,
            size = options.size(),
            "submitting sora video"
        );

        let response = self
            .client
            .post(format!("{}/v1/videos", self.api_base))
            .header("authorization", self.auth_header())
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("sora http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(sora_api_error(status, body));
        }

        let video: SoraVideo = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("sora response decode: {}", e)))?;

        if video.id.is_empty() {
            return Err(CoreError::third_party("sora response missing video id"));
        }

        info!(operation_id = %video.id, status = %video.status, "sora video submitted");
        Ok(video.id)
    }

    async fn poll(&self, operation_id: &str) -> Result<PollStatus, CoreError> {
        let response = self
            .client
            .get(format!("{}/v1/videos/{}", self.api_base, operation_id))
            .header("authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("sora http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(sora_api_error(status, body));
        }

        let video: SoraVideo = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("sora response decode: {}", e)))?;

        let provider_status = if video.status.is_empty() {
            "queued".to_string()
        } else {
            video.status
        };
        let done = matches!(provider_status.as_str(), "completed" | "failed" | "cancelled");

        Ok(PollStatus {
            done,
            asset_ref: (provider_status == "completed").then(|| operation_id.to_string()),
            error: video.error.map(|e| e.message),
            progress: video.progress,
            metadata: serde_json::json!({
                "provider_status": provider_status,
                "progress": video.progress,
                "seconds": video.seconds,
                "size": video.size,
            }),
            status: provider_status,
        })
    }

    async fn download(&self, asset_ref: &str) -> Result<Vec<u8>, CoreError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/videos/{}/content",
                self.api_base, asset_ref
            ))
            .query(&[("variant", "video")])
            .header("authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("sora http error: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(sora_api_error(status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::third_party(format!("sora download read: {}", e)))?;

        info!(
            asset_ref = asset_ref,
            size_bytes = bytes.len(),
            "sora video downloaded"
        );
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_wire_shape() {
        let request = SoraSubmitRequest {
            model: "sora-2-pro".into(),
            prompt: "a calm lake".into(),
            seconds: "8".into(),
            size: Some("720x1280".into()),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""seconds":"8""#));
        assert!(json.contains(r#""size":"720x1280""#));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(sora_api_error(401, "nope".into()).code(), "auth_fail");
        assert_eq!(sora_api_error(429, "slow".into()).code(), "rate_limit");
        assert_eq!(sora_api_error(502, "bad".into()).code(), "third_party_fail");
    }

    #[test]
    fn test_client_carries_requested_model() {
        let pro = SoraClient::new("key", VideoProviderKind::Sora2Pro);
        assert_eq!(pro.provider(), VideoProviderKind::Sora2Pro);
        let base = SoraClient::new("key", VideoProviderKind::Sora2);
        assert_eq!(base.provider().model(), "sora-2");
    }

    #[test]
    fn test_poll_response_decodes_partial_payload() {
        let video: SoraVideo =
            serde_json::from_str(r#"{"id":"vid_1","status":"in_progress","progress":42.0}"#)
                .unwrap();
        assert_eq!(video.id, "vid_1");
        assert_eq!(video.progress, Some(42.0));
        assert!(video.error.is_none());
    }
}
