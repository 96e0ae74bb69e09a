//! Topic registry API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use reelforge_core::store::TopicRecord;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListTopicsResponse {
    pub topics: Vec<TopicRecord>,
    pub total: usize,
}

/// List every topic ever used, with use counts.
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListTopicsResponse>, ApiError> {
    let topics = state.registry().all_topics()?;
    let total = topics.len();
    Ok(Json(ListTopicsResponse { topics, total }))
}
