//! Post API handlers: listing, script edits, prompt building.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use reelforge_core::advance::check_prompts_built;
use reelforge_core::prompt::build_video_prompt_from_seed;
use reelforge_core::store::require_post;
use reelforge_core::{Batch, CoreError, Post};

use super::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a manual script edit.
#[derive(Debug, Deserialize)]
pub struct UpdateScriptBody {
    pub script: String,
}

#[derive(Debug, Serialize)]
pub struct ListPostsResponse {
    pub posts: Vec<Post>,
}

/// Response for a batch-wide prompt build.
#[derive(Debug, Serialize)]
pub struct BuildPromptsResponse {
    /// Batch after the auto-advance check ran.
    pub batch: Batch,
    pub built: usize,
    pub skipped: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all posts of a batch.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<Json<ListPostsResponse>, ApiError> {
    // Surface a 404 for unknown batches instead of an empty list.
    state.ops().get_batch(&batch_id)?;
    let posts = state.posts().list_posts(&batch_id)?;
    Ok(Json(ListPostsResponse { posts }))
}

/// Get a single post.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let post = require_post(state.posts().as_ref(), &id)?;
    Ok(Json(post))
}

/// Store an operator-edited dialogue script on a post.
pub async fn update_script(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateScriptBody>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.ops().update_script(&id, &body.script)?))
}

/// Build the video prompt for one post from its seed data.
pub async fn build_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let mut post = require_post(state.posts().as_ref(), &id)?;
    post.video_prompt = Some(build_video_prompt_from_seed(&post.seed_data)?);
    let stored = state.posts().update_post(&post)?;
    Ok(Json(stored))
}

/// Build prompts for every post of a batch that still lacks one, then run
/// the automatic S4 -> S5 advance check.
pub async fn build_prompts(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<Json<BuildPromptsResponse>, ApiError> {
    state.ops().get_batch(&batch_id)?;

    let mut built = 0;
    let mut skipped = 0;
    let mut first_error: Option<CoreError> = None;

    for mut post in state.posts().list_posts(&batch_id)? {
        if post.video_prompt.is_some() {
            skipped += 1;
            continue;
        }
        match build_video_prompt_from_seed(&post.seed_data) {
            Ok(prompt) => {
                post.video_prompt = Some(prompt);
                state.posts().update_post(&post)?;
                built += 1;
            }
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "prompt build failed for post");
                first_error.get_or_insert(e);
            }
        }
    }

    // Successful builds stay persisted; the first failure is still reported.
    if let Some(e) = first_error {
        return Err(ApiError(e));
    }

    let batch = check_prompts_built(state.batches(), state.posts(), &batch_id)?;
    Ok(Json(BuildPromptsResponse {
        batch,
        built,
        skipped,
    }))
}
