//! Video generation API handlers: submission, polling, recovery.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use reelforge_core::video::{
    generate_all, submit_video, AspectRatio, GenerateAllReport, PollReport, RecoverySummary,
    SubmitOptions, VideoProviderKind, VideoResolution,
};
use reelforge_core::{CoreError, Post};

use super::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for video submission. Every field falls back to the
/// provider defaults (Sora 2 Pro, portrait, 720p, 8 seconds).
#[derive(Debug, Default, Deserialize)]
pub struct SubmitVideoBody {
    pub provider: Option<VideoProviderKind>,
    pub aspect_ratio: Option<AspectRatio>,
    pub resolution: Option<VideoResolution>,
    pub seconds: Option<u32>,
}

impl SubmitVideoBody {
    fn into_options(self) -> SubmitOptions {
        let defaults = SubmitOptions::default();
        SubmitOptions {
            provider: self.provider.unwrap_or(defaults.provider),
            aspect_ratio: self.aspect_ratio.unwrap_or(defaults.aspect_ratio),
            resolution: self.resolution.unwrap_or(defaults.resolution),
            seconds: self.seconds.unwrap_or(defaults.seconds),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit one post's prompt for video generation.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<SubmitVideoBody>>,
) -> Result<Json<Post>, ApiError> {
    let options = body.map(|Json(b)| b).unwrap_or_default().into_options();
    let post = submit_video(
        state.posts(),
        state.providers(),
        state.recovery(),
        &id,
        options,
    )
    .await?;
    Ok(Json(post))
}

/// Submit every eligible post of a batch.
pub async fn generate_batch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
    body: Option<Json<SubmitVideoBody>>,
) -> Result<Json<GenerateAllReport>, ApiError> {
    state.ops().get_batch(&batch_id)?;
    let options = body.map(|Json(b)| b).unwrap_or_default().into_options();
    let report = generate_all(
        state.posts(),
        state.providers(),
        state.recovery(),
        &batch_id,
        options,
    )
    .await?;
    Ok(Json(report))
}

/// Run one poll pass over all in-flight videos immediately, without
/// waiting for the background poller's next tick.
pub async fn poll_once(State(state): State<Arc<AppState>>) -> Result<Json<PollReport>, ApiError> {
    let poller = state
        .poller()
        .ok_or_else(|| CoreError::validation("video polling is not configured"))?;
    let report = poller.poll_once().await?;
    Ok(Json(report))
}

/// Replay the recovery log: finish videos whose operation id was logged
/// after a failed store write.
pub async fn replay_recovery(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecoverySummary>, ApiError> {
    let cdn = state
        .cdn()
        .ok_or_else(|| CoreError::validation("cdn upload is not configured"))?;
    let summary = state
        .recovery()
        .replay(state.providers(), cdn, state.posts())
        .await?;
    Ok(Json(summary))
}
