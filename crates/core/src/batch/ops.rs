//! Batch-level operations over the stores.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::types::{Batch, BatchState, PostTypeCounts};
use crate::error::CoreError;
use crate::post::{Post, PublishStatus, VideoStatus};
use crate::store::{require_batch, require_post, BatchFilter, BatchStore, PostStore};

/// Largest number of posts a single batch may request.
pub const MAX_BATCH_POSTS: u32 = 100;

/// Rollup of a batch's posts, computed on read.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct BatchStatusSummary {
    pub total_posts: usize,
    pub videos_completed: usize,
    pub videos_failed: usize,
    pub qa_passed: usize,
    pub scheduled: usize,
}

impl BatchStatusSummary {
    fn from_posts(posts: &[Post]) -> Self {
        Self {
            total_posts: posts.len(),
            videos_completed: posts
                .iter()
                .filter(|p| p.video_status == VideoStatus::Completed)
                .count(),
            videos_failed: posts
                .iter()
                .filter(|p| p.video_status == VideoStatus::Failed)
                .count(),
            qa_passed: posts.iter().filter(|p| p.qa_pass == Some(true)).count(),
            scheduled: posts
                .iter()
                .filter(|p| p.publish_status == PublishStatus::Scheduled)
                .count(),
        }
    }
}

/// A batch together with its posts and rollup.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDetail {
    pub batch: Batch,
    pub posts: Vec<Post>,
    pub summary: BatchStatusSummary,
}

/// CRUD and lifecycle operations on batches.
#[derive(Clone)]
pub struct BatchOps {
    batches: Arc<dyn BatchStore>,
    posts: Arc<dyn PostStore>,
}

impl BatchOps {
    pub fn new(batches: Arc<dyn BatchStore>, posts: Arc<dyn PostStore>) -> Self {
        Self { batches, posts }
    }

    /// Create a batch in setup state.
    pub fn create_batch(
        &self,
        brand: &str,
        counts: PostTypeCounts,
    ) -> Result<Batch, CoreError> {
        if brand.trim().is_empty() {
            return Err(CoreError::validation("brand must not be empty"));
        }
        let total = counts.total();
        if total == 0 || total > MAX_BATCH_POSTS {
            return Err(CoreError::validation_with(
                format!("post counts must sum to 1..={}", MAX_BATCH_POSTS),
                json!({ "total": total }),
            ));
        }

        let batch = Batch::new(brand.trim(), counts);
        self.batches.insert_batch(&batch)?;
        info!(batch_id = %batch.id, brand = %batch.brand, total, "batch created");
        Ok(batch)
    }

    pub fn get_batch(&self, batch_id: &str) -> Result<Batch, CoreError> {
        require_batch(self.batches.as_ref(), batch_id)
    }

    pub fn list_batches(&self, filter: &BatchFilter) -> Result<Vec<Batch>, CoreError> {
        self.batches.list_batches(filter)
    }

    /// Batch with its posts and a status rollup.
    pub fn batch_detail(&self, batch_id: &str) -> Result<BatchDetail, CoreError> {
        let batch = require_batch(self.batches.as_ref(), batch_id)?;
        let posts = self.posts.list_posts(batch_id)?;
        let summary = BatchStatusSummary::from_posts(&posts);
        Ok(BatchDetail {
            batch,
            posts,
            summary,
        })
    }

    /// Explicitly move a batch to `target`. The store enforces the
    /// transition table.
    pub fn advance_batch(&self, batch_id: &str, target: BatchState) -> Result<Batch, CoreError> {
        let advanced = self.batches.update_state(batch_id, target)?;
        info!(batch_id = batch_id, state = %advanced.state, "batch advanced");
        Ok(advanced)
    }

    pub fn archive_batch(&self, batch_id: &str, archived: bool) -> Result<Batch, CoreError> {
        self.batches.set_archived(batch_id, archived)
    }

    /// Start a fresh setup-state batch with the same post type counts.
    pub fn duplicate_batch(
        &self,
        batch_id: &str,
        new_brand: Option<&str>,
    ) -> Result<Batch, CoreError> {
        let source = require_batch(self.batches.as_ref(), batch_id)?;
        let brand = match new_brand {
            Some(brand) if !brand.trim().is_empty() => brand.trim().to_string(),
            _ => format!("{} (Copy)", source.brand),
        };
        let copy = Batch::new(brand, source.post_type_counts);
        self.batches.insert_batch(&copy)?;
        info!(source_id = batch_id, batch_id = %copy.id, "batch duplicated");
        Ok(copy)
    }

    /// Store an operator-edited dialogue script on a post. The edit takes
    /// precedence over the generated script when the prompt is built.
    pub fn update_script(&self, post_id: &str, script: &str) -> Result<Post, CoreError> {
        let script = script.trim();
        if script.is_empty() {
            return Err(CoreError::validation("script must not be empty"));
        }

        let mut post = require_post(self.posts.as_ref(), post_id)?;
        post.seed_data.script = Some(script.to_string());
        let stored = self.posts.update_post(&post)?;
        info!(post_id = post_id, "post script updated");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{PostType, SeedData};
    use crate::store::SqliteStore;

    fn ops() -> BatchOps {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        BatchOps::new(store.clone(), store)
    }

    #[test]
    fn test_create_batch_validates_counts() {
        let ops = ops();
        let err = ops
            .create_batch("Acme", PostTypeCounts::new(0, 0, 0))
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = ops
            .create_batch("Acme", PostTypeCounts::new(50, 50, 1))
            .unwrap_err();
        assert_eq!(err.details()["total"], 101);

        let err = ops
            .create_batch("  ", PostTypeCounts::new(1, 0, 0))
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_create_batch_starts_in_setup() {
        let ops = ops();
        let batch = ops.create_batch("Acme", PostTypeCounts::new(2, 1, 0)).unwrap();
        assert_eq!(batch.state, BatchState::Setup);
        assert!(!batch.archived);
        assert_eq!(ops.get_batch(&batch.id).unwrap().id, batch.id);
    }

    #[test]
    fn test_batch_detail_rollup() {
        let ops = ops();
        let batch = ops.create_batch("Acme", PostTypeCounts::new(2, 0, 0)).unwrap();

        let mut done = Post::new(
            &batch.id,
            PostType::Value,
            "t1",
            "r",
            "c",
            6.0,
            SeedData::default(),
        );
        done.video_status = VideoStatus::Completed;
        done.qa_pass = Some(true);
        let pending = Post::new(
            &batch.id,
            PostType::Value,
            "t2",
            "r",
            "c",
            6.0,
            SeedData::default(),
        );
        ops.posts.insert_posts(&[done, pending]).unwrap();

        let detail = ops.batch_detail(&batch.id).unwrap();
        assert_eq!(detail.summary.total_posts, 2);
        assert_eq!(detail.summary.videos_completed, 1);
        assert_eq!(detail.summary.qa_passed, 1);
        assert_eq!(detail.summary.scheduled, 0);
    }

    #[test]
    fn test_advance_batch_enforces_transition_table() {
        let ops = ops();
        let batch = ops.create_batch("Acme", PostTypeCounts::new(1, 0, 0)).unwrap();

        let err = ops.advance_batch(&batch.id, BatchState::Qa).unwrap_err();
        assert_eq!(err.code(), "state_transition_error");

        let advanced = ops.advance_batch(&batch.id, BatchState::Seeded).unwrap();
        assert_eq!(advanced.state, BatchState::Seeded);
    }

    #[test]
    fn test_archive_hides_batch_from_active_listing() {
        let ops = ops();
        let batch = ops.create_batch("Acme", PostTypeCounts::new(1, 0, 0)).unwrap();
        ops.archive_batch(&batch.id, true).unwrap();

        let active = ops
            .list_batches(&BatchFilter::new().with_archived(false))
            .unwrap();
        assert!(active.is_empty());
        let archived = ops
            .list_batches(&BatchFilter::new().with_archived(true))
            .unwrap();
        assert_eq!(archived.len(), 1);
    }

    #[test]
    fn test_duplicate_batch_copies_counts_into_setup() {
        let ops = ops();
        let source = ops.create_batch("Acme", PostTypeCounts::new(2, 1, 0)).unwrap();
        ops.advance_batch(&source.id, BatchState::Seeded).unwrap();

        let copy = ops.duplicate_batch(&source.id, None).unwrap();
        assert_ne!(copy.id, source.id);
        assert_eq!(copy.brand, "Acme (Copy)");
        assert_eq!(copy.post_type_counts, source.post_type_counts);
        assert_eq!(copy.state, BatchState::Setup);

        let named = ops.duplicate_batch(&source.id, Some("Acme DE")).unwrap();
        assert_eq!(named.brand, "Acme DE");
    }

    #[test]
    fn test_update_script_stores_manual_override() {
        let ops = ops();
        let post = Post::new(
            "b1",
            PostType::Value,
            "t",
            "r",
            "c",
            6.0,
            SeedData {
                dialog_script: Some("generated".into()),
                ..Default::default()
            },
        );
        ops.posts.insert_posts(std::slice::from_ref(&post)).unwrap();

        let stored = ops.update_script(&post.id, "  edited line  ").unwrap();
        assert_eq!(stored.seed_data.script.as_deref(), Some("edited line"));
        assert_eq!(stored.dialogue(), Some("edited line"));

        let err = ops.update_script(&post.id, "   ").unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
