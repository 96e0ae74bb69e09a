//! Persistent storage traits and the SQLite implementation.
//!
//! Three narrow traits instead of one wide store so components depend only
//! on what they touch. `SqliteStore` implements all of them over a single
//! connection.

mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{Batch, BatchState};
use crate::dedup::TopicFields;
use crate::error::CoreError;
use crate::post::{Post, VideoStatus};

pub use sqlite::SqliteStore;

/// Filter for listing batches.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    /// When set, only batches with this archived flag.
    pub archived: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

impl BatchFilter {
    pub fn new() -> Self {
        Self {
            archived: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// A topic remembered across batches for dedup purposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicRecord {
    pub id: String,
    pub fields: TopicFields,
    pub use_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Batch persistence.
///
/// `update_state` is the single gate for batch state mutation: it runs
/// `validate_transition` against the stored state before writing.
pub trait BatchStore: Send + Sync {
    fn insert_batch(&self, batch: &Batch) -> Result<(), CoreError>;

    fn get_batch(&self, id: &str) -> Result<Option<Batch>, CoreError>;

    fn list_batches(&self, filter: &BatchFilter) -> Result<Vec<Batch>, CoreError>;

    /// Validate and apply a state transition, returning the updated batch.
    fn update_state(&self, id: &str, target: BatchState) -> Result<Batch, CoreError>;

    fn set_archived(&self, id: &str, archived: bool) -> Result<Batch, CoreError>;
}

/// Post persistence.
pub trait PostStore: Send + Sync {
    /// Insert a group of posts atomically. Either all rows land or none do.
    fn insert_posts(&self, posts: &[Post]) -> Result<(), CoreError>;

    fn get_post(&self, id: &str) -> Result<Option<Post>, CoreError>;

    fn list_posts(&self, batch_id: &str) -> Result<Vec<Post>, CoreError>;

    /// Posts across all batches whose video status is one of `statuses`.
    fn list_posts_by_video_status(
        &self,
        statuses: &[VideoStatus],
    ) -> Result<Vec<Post>, CoreError>;

    /// Write the full post row back, bumping `updated_at`. The legacy
    /// `Queued` video status is normalized to `Submitted` on write.
    fn update_post(&self, post: &Post) -> Result<Post, CoreError>;
}

/// Long-lived topic registry used for cross-batch deduplication.
pub trait TopicRegistry: Send + Sync {
    fn all_topics(&self) -> Result<Vec<TopicRecord>, CoreError>;

    /// Record a topic as used. An existing topic with the same title gets
    /// its use count incremented; otherwise a new record is created.
    fn upsert_topic(&self, fields: &TopicFields) -> Result<TopicRecord, CoreError>;
}

/// Fetch a batch or fail with `NotFound`.
pub fn require_batch(store: &dyn BatchStore, id: &str) -> Result<Batch, CoreError> {
    store
        .get_batch(id)?
        .ok_or_else(|| CoreError::NotFound(format!("batch {}", id)))
}

/// Fetch a post or fail with `NotFound`.
pub fn require_post(store: &dyn PostStore, id: &str) -> Result<Post, CoreError> {
    store
        .get_post(id)?
        .ok_or_else(|| CoreError::NotFound(format!("post {}", id)))
}
