//! QA API handlers: manual verdicts, automated checks, batch rollup.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use reelforge_core::qa::{approve_qa, batch_qa_status, run_auto_checks, BatchQaStatus, HttpProber};
use reelforge_core::Post;

use super::error::ApiError;
use crate::state::AppState;

/// Request body for a manual QA verdict.
#[derive(Debug, Deserialize)]
pub struct QaVerdictBody {
    pub approved: bool,
    pub notes: Option<String>,
}

/// Record a manual QA verdict on a post.
pub async fn review_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<QaVerdictBody>,
) -> Result<Json<Post>, ApiError> {
    let post = approve_qa(state.posts(), &id, body.approved, body.notes)?;
    Ok(Json(post))
}

/// Run the automated checks for a post and persist the result.
pub async fn auto_checks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let prober = HttpProber::new();
    let post = run_auto_checks(state.posts(), &prober, &id).await?;
    Ok(Json(post))
}

/// QA summary across a batch.
pub async fn batch_status(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchQaStatus>, ApiError> {
    let status = batch_qa_status(state.batches(), state.posts(), &batch_id)?;
    Ok(Json(status))
}
