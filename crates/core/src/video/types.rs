//! Video generation types and the provider abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Video generation provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VideoProviderKind {
    #[serde(rename = "veo_3_1")]
    Veo31,
    #[serde(rename = "sora_2")]
    Sora2,
    #[serde(rename = "sora_2_pro")]
    Sora2Pro,
}

impl VideoProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoProviderKind::Veo31 => "veo_3_1",
            VideoProviderKind::Sora2 => "sora_2",
            VideoProviderKind::Sora2Pro => "sora_2_pro",
        }
    }

    /// Provider-side model identifier.
    pub fn model(&self) -> &'static str {
        match self {
            VideoProviderKind::Veo31 => "veo-3.1-generate-preview",
            VideoProviderKind::Sora2 => "sora-2",
            VideoProviderKind::Sora2Pro => "sora-2-pro",
        }
    }
}

impl std::fmt::Display for VideoProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "veo_3_1" => Ok(VideoProviderKind::Veo31),
            "sora_2" => Ok(VideoProviderKind::Sora2),
            "sora_2_pro" => Ok(VideoProviderKind::Sora2Pro),
            other => Err(format!("unknown video provider: {}", other)),
        }
    }
}

/// Requested aspect ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested output resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VideoResolution {
    #[serde(rename = "720p")]
    R720p,
    #[serde(rename = "1080p")]
    R1080p,
}

impl VideoResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoResolution::R720p => "720p",
            VideoResolution::R1080p => "1080p",
        }
    }
}

impl std::fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated submission parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SubmitOptions {
    pub provider: VideoProviderKind,
    pub aspect_ratio: AspectRatio,
    pub resolution: VideoResolution,
    /// Requested clip length. Providers accept 4, 8 or 12.
    pub seconds: u32,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            provider: VideoProviderKind::Sora2Pro,
            aspect_ratio: AspectRatio::Portrait,
            resolution: VideoResolution::R720p,
            seconds: 8,
        }
    }
}

impl SubmitOptions {
    /// Check provider constraints before any money is spent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !matches!(self.seconds, 4 | 8 | 12) {
            return Err(CoreError::validation_with(
                "seconds must be 4, 8 or 12",
                serde_json::json!({ "seconds": self.seconds }),
            ));
        }
        if self.resolution == VideoResolution::R1080p && self.aspect_ratio != AspectRatio::Landscape
        {
            return Err(CoreError::validation_with(
                "1080p requires 16:9 aspect ratio",
                serde_json::json!({
                    "resolution": self.resolution.as_str(),
                    "aspect_ratio": self.aspect_ratio.as_str(),
                }),
            ));
        }
        Ok(())
    }

    /// Provider pixel-size string for the aspect/resolution pair.
    pub fn size(&self) -> &'static str {
        match (self.aspect_ratio, self.resolution) {
            (AspectRatio::Portrait, VideoResolution::R720p) => "720x1280",
            (AspectRatio::Portrait, VideoResolution::R1080p) => "1080x1920",
            (AspectRatio::Landscape, VideoResolution::R720p) => "1280x720",
            (AspectRatio::Landscape, VideoResolution::R1080p) => "1920x1080",
        }
    }
}

/// Status of a provider job as of the last poll.
#[derive(Debug, Clone, Default)]
pub struct PollStatus {
    /// The job reached a terminal state (success or failure).
    pub done: bool,
    /// Provider status string (queued, in_progress, processing, completed,
    /// failed, cancelled).
    pub status: String,
    pub progress: Option<f64>,
    /// Reference to pass to `download` when the job completed. For Sora this
    /// is the video id, for Veo the asset URI.
    pub asset_ref: Option<String>,
    pub error: Option<String>,
    /// Raw provider payload, merged into post metadata.
    pub metadata: Value,
}

impl PollStatus {
    pub fn is_completed(&self) -> bool {
        self.done && self.status == "completed"
    }

    pub fn is_failed(&self) -> bool {
        self.done && !self.is_completed()
    }
}

/// Merge `additions` into an existing metadata object. Keys in `additions`
/// win; a non-object existing value is replaced.
pub fn merge_metadata(existing: &Value, additions: Value) -> Value {
    match (existing, additions) {
        (Value::Object(base), Value::Object(extra)) => {
            let mut merged = base.clone();
            for (key, value) in extra {
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (_, additions) => additions,
    }
}

/// Trait for video generation providers.
#[async_trait]
pub trait VideoGenerator: Send + Sync + std::fmt::Debug {
    fn provider(&self) -> VideoProviderKind;

    /// Submit a generation job. Returns the provider operation id.
    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> Result<String, CoreError>;

    /// Poll a previously submitted job.
    async fn poll(&self, operation_id: &str) -> Result<PollStatus, CoreError>;

    /// Download the finished asset.
    async fn download(&self, asset_ref: &str) -> Result<Vec<u8>, CoreError>;
}
