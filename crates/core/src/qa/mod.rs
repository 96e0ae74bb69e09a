//! Quality assurance over completed videos.
//!
//! Manual approval is the gate that matters; the automated checks are a
//! pre-screen over provider metadata plus a reachability probe of the CDN
//! url.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::batch::BatchState;
use crate::error::CoreError;
use crate::post::{Post, VideoStatus};
use crate::store::{require_batch, require_post, BatchStore, PostStore};
use crate::video::AspectRatio;

/// Expected clip duration and tolerance.
pub const TARGET_DURATION_S: f64 = 8.0;
pub const DURATION_TOLERANCE_S: f64 = 0.5;
/// Minimum pixels on the shorter axis.
pub const MIN_RESOLUTION: u32 = 720;

/// Result of the automated pre-screen, persisted on the post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoQaChecks {
    pub duration_ok: bool,
    pub resolution_ok: bool,
    pub aspect_ratio_ok: bool,
    pub file_accessible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_size: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl AutoQaChecks {
    pub fn all_passed(&self) -> bool {
        self.duration_ok && self.resolution_ok && self.aspect_ratio_ok && self.file_accessible
    }
}

/// Per-batch QA summary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchQaStatus {
    pub batch_id: String,
    pub total_posts: usize,
    pub videos_completed: usize,
    pub posts_qa_passed: usize,
    pub posts_qa_failed: usize,
    pub posts_pending_review: usize,
    /// True when every post has passed QA. The S6 -> S7 transition itself
    /// stays an explicit operator call.
    pub can_advance_to_publish: bool,
}

/// Reachability probe for uploaded assets.
#[async_trait]
pub trait UrlProber: Send + Sync {
    /// True when a HEAD request for the url succeeds.
    async fn is_reachable(&self, url: &str) -> bool;
}

/// HEAD probe over reqwest.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Record a manual QA verdict. Only completed videos can be reviewed.
pub fn approve_qa(
    posts: &Arc<dyn PostStore>,
    post_id: &str,
    approved: bool,
    notes: Option<String>,
) -> Result<Post, CoreError> {
    let mut post = require_post(posts.as_ref(), post_id)?;

    if post.video_status != VideoStatus::Completed {
        return Err(CoreError::validation_with(
            "qa review requires a completed video",
            serde_json::json!({ "video_status": post.video_status.as_str() }),
        ));
    }

    post.qa_pass = Some(approved);
    post.qa_notes = notes;
    let stored = posts.update_post(&post)?;

    info!(post_id = post_id, approved = approved, "qa verdict recorded");
    Ok(stored)
}

/// Run the automated checks for one post and persist the result.
pub async fn run_auto_checks(
    posts: &Arc<dyn PostStore>,
    prober: &dyn UrlProber,
    post_id: &str,
) -> Result<Post, CoreError> {
    let mut post = require_post(posts.as_ref(), post_id)?;

    if post.video_status != VideoStatus::Completed {
        return Err(CoreError::validation_with(
            "auto checks require a completed video",
            serde_json::json!({ "video_status": post.video_status.as_str() }),
        ));
    }

    let measured_duration_s = metadata_duration(&post.video_metadata);
    let measured_size = metadata_size(&post.video_metadata);
    let requested_aspect = metadata_aspect(&post.video_metadata);

    let duration_ok = measured_duration_s
        .map(|d| (d - TARGET_DURATION_S).abs() <= DURATION_TOLERANCE_S)
        .unwrap_or(false);

    let dimensions = measured_size.as_deref().and_then(parse_size);
    let resolution_ok = dimensions
        .map(|(w, h)| w.min(h) >= MIN_RESOLUTION)
        .unwrap_or(false);

    let aspect_ratio_ok = match (requested_aspect, dimensions) {
        (Some(AspectRatio::Portrait), Some((w, h))) => h > w,
        (Some(AspectRatio::Landscape), Some((w, h))) => w > h,
        _ => false,
    };

    let file_accessible = match post.video_url.as_deref() {
        Some(url) => prober.is_reachable(url).await,
        None => false,
    };

    let checks = AutoQaChecks {
        duration_ok,
        resolution_ok,
        aspect_ratio_ok,
        file_accessible,
        measured_duration_s,
        measured_size,
        checked_at: Utc::now(),
    };

    info!(
        post_id = post_id,
        passed = checks.all_passed(),
        duration_ok = checks.duration_ok,
        resolution_ok = checks.resolution_ok,
        aspect_ratio_ok = checks.aspect_ratio_ok,
        file_accessible = checks.file_accessible,
        "auto qa checks finished"
    );

    post.qa_auto_checks = Some(checks);
    posts.update_post(&post)
}

/// QA summary across a batch.
pub fn batch_qa_status(
    batches: &Arc<dyn BatchStore>,
    posts: &Arc<dyn PostStore>,
    batch_id: &str,
) -> Result<BatchQaStatus, CoreError> {
    let batch = require_batch(batches.as_ref(), batch_id)?;
    let batch_posts = posts.list_posts(batch_id)?;

    let total_posts = batch_posts.len();
    let videos_completed = batch_posts
        .iter()
        .filter(|p| p.video_status == VideoStatus::Completed)
        .count();
    let posts_qa_passed = batch_posts.iter().filter(|p| p.qa_pass == Some(true)).count();
    let posts_qa_failed = batch_posts
        .iter()
        .filter(|p| p.qa_pass == Some(false))
        .count();
    let posts_pending_review = total_posts - posts_qa_passed - posts_qa_failed;

    Ok(BatchQaStatus {
        batch_id: batch.id,
        total_posts,
        videos_completed,
        posts_qa_passed,
        posts_qa_failed,
        posts_pending_review,
        can_advance_to_publish: total_posts > 0
            && posts_qa_passed == total_posts
            && batch.state == BatchState::Qa,
    })
}

fn metadata_duration(metadata: &Value) -> Option<f64> {
    let seconds = metadata
        .get("provider_metadata")
        .and_then(|m| m.get("seconds"))
        .or_else(|| metadata.get("requested_seconds"))?;
    match seconds {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn metadata_size(metadata: &Value) -> Option<String> {
    metadata
        .get("provider_metadata")
        .and_then(|m| m.get("size"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn metadata_aspect(metadata: &Value) -> Option<AspectRatio> {
    match metadata.get("requested_aspect_ratio").and_then(Value::as_str) {
        Some("9:16") => Some(AspectRatio::Portrait),
        Some("16:9") => Some(AspectRatio::Landscape),
        _ => None,
    }
}

fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{PostType, SeedData};
    use crate::store::SqliteStore;

    struct FixedProber(bool);

    #[async_trait]
    impl UrlProber for FixedProber {
        async fn is_reachable(&self, _url: &str) -> bool {
            self.0
        }
    }

    fn completed_post(batch_id: &str) -> Post {
        let mut post = Post::new(
            batch_id,
            PostType::Value,
            "Hydration",
            "education",
            "starte heute",
            6.0,
            SeedData::default(),
        );
        post.video_status = VideoStatus::Completed;
        post.video_url = Some("https://cdn.example/post.mp4".into());
        post.video_metadata = serde_json::json!({
            "requested_aspect_ratio": "9:16",
            "requested_resolution": "720p",
            "provider_metadata": { "seconds": "8", "size": "720x1280" },
        });
        post
    }

    fn stores() -> (Arc<dyn BatchStore>, Arc<dyn PostStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (store.clone(), store)
    }

    #[test]
    fn test_approve_requires_completed_video() {
        let (_, posts) = stores();
        let mut post = completed_post("b1");
        post.video_status = VideoStatus::Processing;
        posts.insert_posts(std::slice::from_ref(&post)).unwrap();

        let err = approve_qa(&posts, &post.id, true, None).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_approve_records_verdict_and_notes() {
        let (_, posts) = stores();
        let post = completed_post("b1");
        posts.insert_posts(std::slice::from_ref(&post)).unwrap();

        let stored = approve_qa(&posts, &post.id, false, Some("jitter at 0:03".into())).unwrap();
        assert_eq!(stored.qa_pass, Some(false));
        assert_eq!(stored.qa_notes.as_deref(), Some("jitter at 0:03"));
    }

    #[tokio::test]
    async fn test_auto_checks_pass_for_conforming_video() {
        let (_, posts) = stores();
        let post = completed_post("b1");
        posts.insert_posts(std::slice::from_ref(&post)).unwrap();

        let stored = run_auto_checks(&posts, &FixedProber(true), &post.id)
            .await
            .unwrap();
        let checks = stored.qa_auto_checks.unwrap();
        assert!(checks.all_passed());
        assert_eq!(checks.measured_duration_s, Some(8.0));
        assert_eq!(checks.measured_size.as_deref(), Some("720x1280"));
    }

    #[tokio::test]
    async fn test_auto_checks_flag_duration_outside_tolerance() {
        let (_, posts) = stores();
        let mut post = completed_post("b1");
        post.video_metadata["provider_metadata"]["seconds"] = serde_json::json!("12");
        posts.insert_posts(std::slice::from_ref(&post)).unwrap();

        let stored = run_auto_checks(&posts, &FixedProber(true), &post.id)
            .await
            .unwrap();
        let checks = stored.qa_auto_checks.unwrap();
        assert!(!checks.duration_ok);
        assert!(!checks.all_passed());
        assert!(checks.resolution_ok);
    }

    #[tokio::test]
    async fn test_auto_checks_flag_aspect_mismatch_and_unreachable_file() {
        let (_, posts) = stores();
        let mut post = completed_post("b1");
        post.video_metadata["provider_metadata"]["size"] = serde_json::json!("1280x720");
        posts.insert_posts(std::slice::from_ref(&post)).unwrap();

        let stored = run_auto_checks(&posts, &FixedProber(false), &post.id)
            .await
            .unwrap();
        let checks = stored.qa_auto_checks.unwrap();
        assert!(!checks.aspect_ratio_ok);
        assert!(!checks.file_accessible);
    }

    #[test]
    fn test_batch_qa_status_counts_and_gate() {
        let (batches, posts) = stores();
        let batch = crate::batch::Batch::new("Acme", crate::batch::PostTypeCounts::new(2, 0, 0));
        batches.insert_batch(&batch).unwrap();

        let mut passed = completed_post(&batch.id);
        passed.qa_pass = Some(true);
        let mut failed = completed_post(&batch.id);
        failed.qa_pass = Some(false);
        posts.insert_posts(&[passed, failed]).unwrap();

        let status = batch_qa_status(&batches, &posts, &batch.id).unwrap();
        assert_eq!(status.total_posts, 2);
        assert_eq!(status.videos_completed, 2);
        assert_eq!(status.posts_qa_passed, 1);
        assert_eq!(status.posts_qa_failed, 1);
        assert_eq!(status.posts_pending_review, 0);
        assert!(!status.can_advance_to_publish);
    }

    #[test]
    fn test_empty_batch_cannot_advance() {
        let (batches, posts) = stores();
        let batch = crate::batch::Batch::new("Acme", crate::batch::PostTypeCounts::default());
        batches.insert_batch(&batch).unwrap();

        let status = batch_qa_status(&batches, &posts, &batch.id).unwrap();
        assert_eq!(status.total_posts, 0);
        assert!(!status.can_advance_to_publish);
    }
}
