//! Video submission: single post and batch fan-out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::metrics::VIDEO_SUBMISSIONS;
use crate::prompt::{compose_prompt_text, validate_video_prompt};
use crate::post::{Post, VideoStatus};
use crate::store::{require_post, PostStore};

use super::recovery::{RecoveryLog, RecoveryRecord};
use super::types::{merge_metadata, SubmitOptions};
use super::VideoProviders;

/// Report of a batch-wide `generate_all` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateAllReport {
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub submitted_post_ids: Vec<String>,
}

/// Submit one post's prompt for video generation.
///
/// The provider operation id is logged at warn level BEFORE the store write:
/// the submission is paid for at that point, and the log line is the last
/// resort if both the store write and the recovery append fail.
pub async fn submit_video(
    posts: &Arc<dyn PostStore>,
    providers: &VideoProviders,
    recovery: &RecoveryLog,
    post_id: &str,
    options: SubmitOptions,
) -> Result<Post, CoreError> {
    let post = require_post(posts.as_ref(), post_id)?;

    let prompt = post
        .video_prompt
        .as_ref()
        .ok_or_else(|| CoreError::validation("post has no video prompt"))?;

    if post.video_status.is_active() || post.video_status == VideoStatus::Completed {
        return Err(CoreError::IdempotencyConflict(format!(
            "post {} already has a video in status {}",
            post_id, post.video_status
        )));
    }

    options.validate()?;
    validate_video_prompt(prompt)?;
    let prompt_text = compose_prompt_text(prompt);

    let provider = providers.get(options.provider)?;
    let operation_id = provider.submit(&prompt_text, &options).await?;
    VIDEO_SUBMISSIONS
        .with_label_values(&[options.provider.as_str()])
        .inc();

    warn!(
        post_id = post_id,
        operation_id = %operation_id,
        provider = %options.provider,
        "PAID VIDEO SUBMITTED, persisting operation id"
    );

    let mut updated = post;
    updated.video_provider = Some(options.provider);
    updated.video_operation_id = Some(operation_id.clone());
    updated.video_status = VideoStatus::Submitted;
    updated.video_url = None;
    updated.video_metadata = merge_metadata(
        &updated.video_metadata,
        serde_json::json!({
            "provider": options.provider.as_str(),
            "requested_aspect_ratio": options.aspect_ratio.as_str(),
            "requested_resolution": options.resolution.as_str(),
            "requested_seconds": options.seconds,
        }),
    );

    match posts.update_post(&updated) {
        Ok(stored) => {
            info!(post_id = post_id, operation_id = %operation_id, "video submission stored");
            Ok(stored)
        }
        Err(store_error) => {
            let record = RecoveryRecord::db_update_failed(
                post_id,
                &operation_id,
                options.provider,
                format!("submit_{}", post_id),
            );
            if let Err(log_error) = recovery.append(&record) {
                warn!(
                    post_id = post_id,
                    operation_id = %operation_id,
                    error = %log_error,
                    "recovery append failed after store failure"
                );
            }
            Err(store_error)
        }
    }
}

/// Submit every eligible post in a batch.
///
/// Posts without a prompt and posts whose video is already submitted,
/// processing or completed are skipped. A failed submission for one post
/// does not stop the rest.
pub async fn generate_all(
    posts: &Arc<dyn PostStore>,
    providers: &VideoProviders,
    recovery: &RecoveryLog,
    batch_id: &str,
    options: SubmitOptions,
) -> Result<GenerateAllReport, CoreError> {
    options.validate()?;

    let batch_posts = posts.list_posts(batch_id)?;
    let mut report = GenerateAllReport::default();

    for post in batch_posts {
        if post.video_prompt.is_none() {
            report.skipped += 1;
            continue;
        }
        if post.video_status.is_active() || post.video_status == VideoStatus::Completed {
            report.skipped += 1;
            continue;
        }

        match submit_video(posts, providers, recovery, &post.id, options).await {
            Ok(_) => {
                report.submitted += 1;
                report.submitted_post_ids.push(post.id);
            }
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "batch video submission failed for post");
                report.failed += 1;
            }
        }
    }

    info!(
        batch_id = batch_id,
        submitted = report.submitted,
        skipped = report.skipped,
        failed = report.failed,
        "batch video generation finished"
    );
    Ok(report)
}
