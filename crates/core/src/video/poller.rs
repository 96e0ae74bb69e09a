//! Background poller driving submitted videos to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::cdn::CdnUploader;
use crate::error::CoreError;
use crate::metrics::{POLL_PASSES, VIDEOS_COMPLETED, VIDEOS_FAILED};
use crate::post::{Post, VideoStatus};
use crate::store::PostStore;

use super::types::{merge_metadata, VideoProviderKind};
use super::VideoProviders;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Counts from one poll pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollReport {
    pub polled: usize,
    pub completed: usize,
    pub failed: usize,
    pub still_processing: usize,
}

/// Fixed-interval poller over posts with an in-flight provider job.
pub struct VideoPoller {
    posts: Arc<dyn PostStore>,
    providers: VideoProviders,
    cdn: Arc<dyn CdnUploader>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl VideoPoller {
    pub fn new(
        posts: Arc<dyn PostStore>,
        providers: VideoProviders,
        cdn: Arc<dyn CdnUploader>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            posts,
            providers,
            cdn,
            interval: DEFAULT_POLL_INTERVAL,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the polling loop.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Video poller already running");
            return;
        }

        let poller = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(interval_secs = poller.interval.as_secs(), "Video poller started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Video poller received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poller.interval) => {
                        if !poller.running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = poller.poll_once().await {
                            warn!("Poll cycle failed: {}", e);
                        }
                    }
                }
            }
            info!("Video poller stopped");
        });
    }

    /// Stop the polling loop.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run one poll pass over every post with an active video job.
    ///
    /// A failure for one post marks that post failed and moves on; it never
    /// aborts the pass.
    pub async fn poll_once(&self) -> Result<PollReport, CoreError> {
        POLL_PASSES.inc();
        let pending = self.posts.list_posts_by_video_status(&[
            VideoStatus::Queued,
            VideoStatus::Submitted,
            VideoStatus::Processing,
        ])?;

        let mut report = PollReport {
            polled: pending.len(),
            ..Default::default()
        };
        debug!(count = pending.len(), "polling pending videos");

        for post in pending {
            match self.process_post(&post).await {
                Ok(Outcome::Completed) => report.completed += 1,
                Ok(Outcome::StillProcessing) => report.still_processing += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(post_id = %post.id, error = %e, "video processing failed");
                    if let Err(mark_error) = self.mark_failed(&post, &e.to_string()) {
                        error!(
                            post_id = %post.id,
                            error = %mark_error,
                            "failed to mark video as failed"
                        );
                    }
                }
            }
        }

        Ok(report)
    }

    async fn process_post(&self, post: &Post) -> Result<Outcome, CoreError> {
        let (operation_id, provider_kind) =
            match (&post.video_operation_id, post.video_provider) {
                (Some(op), Some(kind)) => (op.clone(), kind),
                _ => {
                    warn!(
                        post_id = %post.id,
                        has_operation_id = post.video_operation_id.is_some(),
                        has_provider = post.video_provider.is_some(),
                        "post has active video status but no operation data"
                    );
                    return Ok(Outcome::StillProcessing);
                }
            };

        let provider = self.providers.get(provider_kind)?;
        let status = provider.poll(&operation_id).await?;

        debug!(
            post_id = %post.id,
            status = %status.status,
            progress = ?status.progress,
            "video status polled"
        );

        if status.is_completed() {
            let asset_ref = status
                .asset_ref
                .clone()
                .ok_or_else(|| CoreError::third_party("completed job has no asset reference"))?;
            let bytes = provider.download(&asset_ref).await?;
            store_completed_video(
                self.posts.as_ref(),
                self.cdn.as_ref(),
                post.clone(),
                provider_kind,
                bytes,
                status.metadata,
                false,
            )
            .await?;
            return Ok(Outcome::Completed);
        }

        if status.is_failed() {
            let reason = status
                .error
                .unwrap_or_else(|| format!("provider status {}", status.status));
            self.mark_failed(post, &reason)?;
            return Ok(Outcome::Failed);
        }

        // Non-terminal: status-only update, metadata merged.
        let mut updated = post.clone();
        updated.video_status = if matches!(status.status.as_str(), "in_progress" | "processing")
        {
            VideoStatus::Processing
        } else {
            VideoStatus::Submitted
        };
        updated.video_metadata = merge_metadata(&updated.video_metadata, status.metadata);
        self.posts.update_post(&updated)?;
        Ok(Outcome::StillProcessing)
    }

    fn mark_failed(&self, post: &Post, reason: &str) -> Result<(), CoreError> {
        let provider = post.video_provider.map(|p| p.as_str()).unwrap_or("unknown");
        VIDEOS_FAILED.with_label_values(&[provider]).inc();
        let mut updated = post.clone();
        updated.video_status = VideoStatus::Failed;
        updated.video_metadata = merge_metadata(
            &updated.video_metadata,
            serde_json::json!({ "error": reason }),
        );
        self.posts.update_post(&updated)?;
        error!(post_id = %post.id, reason = reason, "video marked failed");
        Ok(())
    }
}

enum Outcome {
    Completed,
    StillProcessing,
    Failed,
}

/// Upload finished bytes to the CDN and persist the completed post.
///
/// Shared by the poller and the recovery replay so both produce the same
/// post shape: Completed status, CDN url, merged metadata.
pub(super) async fn store_completed_video(
    posts: &dyn PostStore,
    cdn: &dyn CdnUploader,
    mut post: Post,
    provider: VideoProviderKind,
    bytes: Vec<u8>,
    provider_metadata: serde_json::Value,
    recovered: bool,
) -> Result<Post, CoreError> {
    let file_name = format!("post_{}.mp4", post.id);
    let upload = cdn.upload(bytes, &file_name).await?;

    let mut additions = serde_json::json!({
        "provider": provider.as_str(),
        "imagekit_file_id": upload.file_id,
        "size_bytes": upload.size,
        "file_path": upload.file_path,
        "thumbnail_url": upload.thumbnail_url,
        "provider_metadata": provider_metadata,
    });
    if recovered {
        additions["recovered"] = serde_json::Value::Bool(true);
        additions["recovery_timestamp"] =
            serde_json::Value::String(chrono::Utc::now().to_rfc3339());
    }

    post.video_status = VideoStatus::Completed;
    post.video_url = Some(upload.url.clone());
    post.video_metadata = merge_metadata(&post.video_metadata, additions);
    let stored = posts.update_post(&post)?;
    VIDEOS_COMPLETED.with_label_values(&[provider.as_str()]).inc();

    info!(
        post_id = %stored.id,
        provider = %provider,
        video_url = %upload.url,
        size_bytes = upload.size,
        "video completed"
    );
    Ok(stored)
}
