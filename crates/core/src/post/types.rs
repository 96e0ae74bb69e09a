//! Post data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prompt::VideoPrompt;
use crate::qa::AutoQaChecks;
use crate::research::{DialogScripts, Framework, SeedFacts, SourceRef};
use crate::video::VideoProviderKind;

/// Content category of a post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Value,
    Lifestyle,
    Product,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Value => "value",
            PostType::Lifestyle => "lifestyle",
            PostType::Product => "product",
        }
    }

    pub fn all() -> [PostType; 3] {
        [PostType::Value, PostType::Lifestyle, PostType::Product]
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Video generation sub-state of a post.
///
/// `Queued` is normalized to `Submitted` when written through the store, but
/// remains readable for rows written before the normalization existed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Pending,
    Queued,
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Queued => "queued",
            VideoStatus::Submitted => "submitted",
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }

    /// A provider job exists and has not reached a terminal status.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            VideoStatus::Queued | VideoStatus::Submitted | VideoStatus::Processing
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publish scheduling state of a post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    Unscheduled,
    Scheduled,
}

/// Research seed payload a post is created from.
///
/// `script` holds a manual override when an operator edits the dialogue;
/// the prompt builder prefers it over the generated `dialog_script`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SeedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Generated dialogue line selected for this post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_s: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_summary: Option<String>,

    /// Ad-style dialogue variants bucketed by category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_scripts: Option<DialogScripts>,

    /// Strict-extractor facts from the brand brief.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_seed: Option<SeedFacts>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

/// A single short-form video post moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier (UUID).
    pub id: String,

    /// Owning batch.
    pub batch_id: String,

    pub post_type: PostType,

    pub topic_title: String,
    pub topic_rotation: String,
    pub topic_cta: String,

    /// Spoken duration of the script in seconds.
    pub spoken_duration_s: f64,

    pub seed_data: SeedData,

    /// Assembled video generation prompt, present from S5 onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_prompt: Option<VideoPrompt>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_provider: Option<VideoProviderKind>,

    /// Provider operation id of the submitted job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_operation_id: Option<String>,

    #[serde(default)]
    pub video_status: VideoStatus,

    /// CDN URL of the finished video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Provider/CDN metadata, merged across updates.
    #[serde(default)]
    pub video_metadata: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_pass: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_auto_checks: Option<AutoQaChecks>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social_networks: Vec<String>,

    #[serde(default)]
    pub publish_status: PublishStatus,

    /// Per-network post identifiers filled in after publication.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platform_ids: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post from a research seed.
    pub fn new(
        batch_id: impl Into<String>,
        post_type: PostType,
        topic_title: impl Into<String>,
        topic_rotation: impl Into<String>,
        topic_cta: impl Into<String>,
        spoken_duration_s: f64,
        seed_data: SeedData,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.into(),
            post_type,
            topic_title: topic_title.into(),
            topic_rotation: topic_rotation.into(),
            topic_cta: topic_cta.into(),
            spoken_duration_s,
            seed_data,
            video_prompt: None,
            video_provider: None,
            video_operation_id: None,
            video_status: VideoStatus::Pending,
            video_url: None,
            video_metadata: serde_json::Value::Null,
            qa_pass: None,
            qa_notes: None,
            qa_auto_checks: None,
            scheduled_at: None,
            social_networks: Vec::new(),
            publish_status: PublishStatus::Unscheduled,
            platform_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The dialogue the prompt builder will use, if any.
    pub fn dialogue(&self) -> Option<&str> {
        self.seed_data
            .script
            .as_deref()
            .or(self.seed_data.dialog_script.as_deref())
    }
}
