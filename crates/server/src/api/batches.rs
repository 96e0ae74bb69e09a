//! Batch API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use reelforge_core::batch::{BatchDetail, PostTypeCounts};
use reelforge_core::discovery::{discover_topics, DiscoveryReport};
use reelforge_core::store::BatchFilter;
use reelforge_core::{Batch, BatchState, Post};

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for batch listings.
const MAX_LIMIT: i64 = 500;

/// Default limit for batch listings.
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a batch.
#[derive(Debug, Deserialize)]
pub struct CreateBatchBody {
    pub brand: String,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub lifestyle: u32,
    #[serde(default)]
    pub product: u32,
}

/// Query parameters for listing batches.
#[derive(Debug, Deserialize)]
pub struct ListBatchesParams {
    /// Include archived batches instead of active ones.
    pub archived: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for an explicit state transition.
#[derive(Debug, Deserialize)]
pub struct AdvanceBatchBody {
    pub target: BatchState,
}

/// Request body for archiving or unarchiving a batch.
#[derive(Debug, Deserialize)]
pub struct ArchiveBatchBody {
    pub archived: bool,
}

/// Request body for duplicating a batch.
#[derive(Debug, Default, Deserialize)]
pub struct DuplicateBatchBody {
    pub new_brand: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListBatchesResponse {
    pub batches: Vec<Batch>,
    pub limit: i64,
    pub offset: i64,
}

/// Response for a discovery run.
#[derive(Serialize)]
pub struct DiscoveryResponse {
    pub batch: Batch,
    pub posts: Vec<Post>,
    pub rejected_duplicates: usize,
}

impl From<DiscoveryReport> for DiscoveryResponse {
    fn from(report: DiscoveryReport) -> Self {
        Self {
            batch: report.batch,
            posts: report.posts,
            rejected_duplicates: report.rejected_duplicates,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new batch in setup state.
pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBatchBody>,
) -> Result<(StatusCode, Json<Batch>), ApiError> {
    let counts = PostTypeCounts::new(body.value, body.lifestyle, body.product);
    let batch = state.ops().create_batch(&body.brand, counts)?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// List batches, active by default.
pub async fn list_batches(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListBatchesParams>,
) -> Result<Json<ListBatchesResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let filter = BatchFilter::new()
        .with_archived(params.archived.unwrap_or(false))
        .with_limit(limit)
        .with_offset(offset);
    let batches = state.ops().list_batches(&filter)?;

    Ok(Json(ListBatchesResponse {
        batches,
        limit,
        offset,
    }))
}

/// Get a batch with its posts and status rollup.
pub async fn get_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BatchDetail>, ApiError> {
    Ok(Json(state.ops().batch_detail(&id)?))
}

/// Explicitly move a batch to a target state.
pub async fn advance_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AdvanceBatchBody>,
) -> Result<Json<Batch>, ApiError> {
    Ok(Json(state.ops().advance_batch(&id, body.target)?))
}

/// Archive or unarchive a batch (soft delete).
pub async fn archive_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ArchiveBatchBody>,
) -> Result<Json<Batch>, ApiError> {
    Ok(Json(state.ops().archive_batch(&id, body.archived)?))
}

/// Start a fresh batch with the same post type counts.
pub async fn duplicate_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<DuplicateBatchBody>>,
) -> Result<(StatusCode, Json<Batch>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let batch = state.ops().duplicate_batch(&id, body.new_brand.as_deref())?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// Run topic discovery for a setup-state batch, seeding its posts.
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let report = discover_topics(
        state.batches(),
        state.posts(),
        state.registry(),
        state.orchestrator(),
        &id,
    )
    .await?;
    Ok(Json(DiscoveryResponse::from(report)))
}
