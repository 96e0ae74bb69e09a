//! Publish planning API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use reelforge_core::publish::{
    confirm_publish, get_batch_plan, schedule_post, set_batch_plan, BatchPlan, PostSchedule,
};
use reelforge_core::{Batch, Post};

use super::error::ApiError;
use crate::state::AppState;

/// Request body for scheduling a single post.
#[derive(Debug, Deserialize)]
pub struct SchedulePostBody {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub social_networks: Vec<String>,
}

/// Request body for applying a full batch plan.
#[derive(Debug, Deserialize)]
pub struct SetPlanBody {
    pub schedules: Vec<PostSchedule>,
}

/// Schedule one post for publication.
pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SchedulePostBody>,
) -> Result<Json<Post>, ApiError> {
    let post = schedule_post(state.posts(), &id, body.scheduled_at, body.social_networks)?;
    Ok(Json(post))
}

/// Apply a full publish plan to a batch.
pub async fn set_plan(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
    Json(body): Json<SetPlanBody>,
) -> Result<Json<BatchPlan>, ApiError> {
    let plan = set_batch_plan(state.batches(), state.posts(), &batch_id, body.schedules)?;
    Ok(Json(plan))
}

/// Read back the current plan of a batch.
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchPlan>, ApiError> {
    let plan = get_batch_plan(state.batches(), state.posts(), &batch_id)?;
    Ok(Json(plan))
}

/// Confirm the plan and close the batch out.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    let batch = confirm_publish(state.batches(), state.posts(), &batch_id)?;
    Ok(Json(batch))
}
