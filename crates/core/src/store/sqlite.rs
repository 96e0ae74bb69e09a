//! SQLite-backed store implementation.
//!
//! Batches and posts are stored as JSON documents with the columns the
//! queries filter on duplicated alongside. One connection behind a mutex;
//! every mutation is a single read-then-write while holding the lock.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::batch::{validate_transition, Batch, BatchState};
use crate::dedup::TopicFields;
use crate::error::CoreError;
use crate::metrics::{BATCHES_COMPLETED, BATCH_TRANSITIONS};
use crate::post::{Post, VideoStatus};

use super::{BatchFilter, BatchStore, PostStore, TopicRecord, TopicRegistry};

/// SQLite store implementing all persistence traits.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS batches (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                archived INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                batch_id TEXT NOT NULL,
                video_status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS topics (
                id TEXT PRIMARY KEY,
                title_key TEXT NOT NULL UNIQUE,
                use_count INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                last_used_at TEXT NOT NULL,
                doc TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_batches_archived ON batches(archived);
            CREATE INDEX IF NOT EXISTS idx_posts_batch_id ON posts(batch_id);
            CREATE INDEX IF NOT EXISTS idx_posts_video_status ON posts(video_status);
            "#,
        )?;
        Ok(())
    }

    fn row_doc(row: &rusqlite::Row) -> rusqlite::Result<String> {
        row.get(0)
    }

    fn decode_batch(doc: String) -> Result<Batch, CoreError> {
        Ok(serde_json::from_str(&doc)?)
    }

    fn decode_post(doc: String) -> Result<Post, CoreError> {
        Ok(serde_json::from_str(&doc)?)
    }
}

impl BatchStore for SqliteStore {
    fn insert_batch(&self, batch: &Batch) -> Result<(), CoreError> {
        let conn = self.conn.lock().unwrap();
        let doc = serde_json::to_string(batch)?;
        conn.execute(
            "INSERT INTO batches (id, state, archived, created_at, doc) VALUES (?, ?, ?, ?, ?)",
            params![
                batch.id,
                batch.state.as_str(),
                batch.archived as i64,
                batch.created_at.to_rfc3339(),
                doc,
            ],
        )?;
        Ok(())
    }

    fn get_batch(&self, id: &str) -> Result<Option<Batch>, CoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT doc FROM batches WHERE id = ?",
            params![id],
            Self::row_doc,
        );
        match result {
            Ok(doc) => Ok(Some(Self::decode_batch(doc)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_batches(&self, filter: &BatchFilter) -> Result<Vec<Batch>, CoreError> {
        let conn = self.conn.lock().unwrap();

        let mut conditions: Vec<&str> = Vec::new();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(archived) = filter.archived {
            conditions.push("archived = ?");
            bound.push(Box::new(archived as i64));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT doc FROM batches {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            where_clause
        );
        bound.push(Box::new(filter.limit));
        bound.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), Self::row_doc)?;

        let mut batches = Vec::new();
        for row in rows {
            batches.push(Self::decode_batch(row?)?);
        }
        Ok(batches)
    }

    fn update_state(&self, id: &str, target: BatchState) -> Result<Batch, CoreError> {
        let conn = self.conn.lock().unwrap();
        let doc: String = conn.query_row(
            "SELECT doc FROM batches WHERE id = ?",
            params![id],
            Self::row_doc,
        )?;
        let mut batch = Self::decode_batch(doc)?;

        validate_transition(batch.state, target)?;

        batch.state = target;
        batch.updated_at = Utc::now();
        let doc = serde_json::to_string(&batch)?;
        conn.execute(
            "UPDATE batches SET state = ?, doc = ? WHERE id = ?",
            params![batch.state.as_str(), doc, id],
        )?;
        BATCH_TRANSITIONS.with_label_values(&[target.as_str()]).inc();
        if target == BatchState::Complete {
            BATCHES_COMPLETED.inc();
        }
        Ok(batch)
    }

    fn set_archived(&self, id: &str, archived: bool) -> Result<Batch, CoreError> {
        let conn = self.conn.lock().unwrap();
        let doc: String = conn.query_row(
            "SELECT doc FROM batches WHERE id = ?",
            params![id],
            Self::row_doc,
        )?;
        let mut batch = Self::decode_batch(doc)?;

        batch.archived = archived;
        batch.updated_at = Utc::now();
        let doc = serde_json::to_string(&batch)?;
        conn.execute(
            "UPDATE batches SET archived = ?, doc = ? WHERE id = ?",
            params![archived as i64, doc, id],
        )?;
        Ok(batch)
    }
}

impl PostStore for SqliteStore {
    fn insert_posts(&self, posts: &[Post]) -> Result<(), CoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Internal(format!("transaction begin: {}", e)))?;
        for post in posts {
            let doc = serde_json::to_string(post)?;
            tx.execute(
                "INSERT INTO posts (id, batch_id, video_status, created_at, doc) VALUES (?, ?, ?, ?, ?)",
                params![
                    post.id,
                    post.batch_id,
                    post.video_status.as_str(),
                    post.created_at.to_rfc3339(),
                    doc,
                ],
            )?;
        }
        tx.commit()
            .map_err(|e| CoreError::Internal(format!("transaction commit: {}", e)))?;
        Ok(())
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>, CoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT doc FROM posts WHERE id = ?",
            params![id],
            Self::row_doc,
        );
        match result {
            Ok(doc) => Ok(Some(Self::decode_post(doc)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_posts(&self, batch_id: &str) -> Result<Vec<Post>, CoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT doc FROM posts WHERE batch_id = ? ORDER BY created_at ASC")?;
        let rows = stmt.query_map(params![batch_id], Self::row_doc)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(Self::decode_post(row?)?);
        }
        Ok(posts)
    }

    fn list_posts_by_video_status(
        &self,
        statuses: &[VideoStatus],
    ) -> Result<Vec<Post>, CoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT doc FROM posts WHERE video_status IN ({}) ORDER BY created_at ASC",
            placeholders
        );
        let bound: Vec<Box<dyn rusqlite::ToSql>> = statuses
            .iter()
            .map(|s| Box::new(s.as_str()) as Box<dyn rusqlite::ToSql>)
            .collect();
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), Self::row_doc)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(Self::decode_post(row?)?);
        }
        Ok(posts)
    }

    fn update_post(&self, post: &Post) -> Result<Post, CoreError> {
        let conn = self.conn.lock().unwrap();

        let mut updated = post.clone();
        if updated.video_status == VideoStatus::Queued {
            updated.video_status = VideoStatus::Submitted;
        }
        updated.updated_at = Utc::now();

        let doc = serde_json::to_string(&updated)?;
        let changed = conn.execute(
            "UPDATE posts SET video_status = ?, doc = ? WHERE id = ?",
            params![updated.video_status.as_str(), doc, updated.id],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound(format!("post {}", updated.id)));
        }
        Ok(updated)
    }
}

impl TopicRegistry for SqliteStore {
    fn all_topics(&self) -> Result<Vec<TopicRecord>, CoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT doc FROM topics ORDER BY created_at ASC")?;
        let rows = stmt.query_map([], Self::row_doc)?;

        let mut topics = Vec::new();
        for row in rows {
            let doc: String = row?;
            topics.push(serde_json::from_str(&doc)?);
        }
        Ok(topics)
    }

    fn upsert_topic(&self, fields: &TopicFields) -> Result<TopicRecord, CoreError> {
        let conn = self.conn.lock().unwrap();
        let title_key = fields.title.trim().to_lowercase();
        let now = Utc::now();

        let existing = conn.query_row(
            "SELECT doc FROM topics WHERE title_key = ?",
            params![title_key],
            Self::row_doc,
        );

        match existing {
            Ok(doc) => {
                let mut record: TopicRecord = serde_json::from_str(&doc)?;
                record.use_count += 1;
                record.last_used_at = now;
                let doc = serde_json::to_string(&record)?;
                conn.execute(
                    "UPDATE topics SET use_count = ?, last_used_at = ?, doc = ? WHERE title_key = ?",
                    params![record.use_count, now.to_rfc3339(), doc, title_key],
                )?;
                Ok(record)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let record = TopicRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    fields: fields.clone(),
                    use_count: 1,
                    created_at: now,
                    last_used_at: now,
                };
                let doc = serde_json::to_string(&record)?;
                conn.execute(
                    "INSERT INTO topics (id, title_key, use_count, created_at, last_used_at, doc) VALUES (?, ?, ?, ?, ?, ?)",
                    params![record.id, title_key, record.use_count, now.to_rfc3339(), now.to_rfc3339(), doc],
                )?;
                Ok(record)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PostTypeCounts;
    use crate::post::{PostType, SeedData};

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn sample_batch() -> Batch {
        Batch::new("Acme", PostTypeCounts::new(2, 1, 0))
    }

    fn sample_post(batch_id: &str) -> Post {
        Post::new(
            batch_id,
            PostType::Value,
            "Hydration myths",
            "education",
            "drink up today",
            6.0,
            SeedData::default(),
        )
    }

    #[test]
    fn test_batch_round_trip() {
        let store = store();
        let batch = sample_batch();
        store.insert_batch(&batch).unwrap();

        let loaded = store.get_batch(&batch.id).unwrap().unwrap();
        assert_eq!(loaded, batch);
        assert!(store.get_batch("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_state_enforces_transition_table() {
        let store = store();
        let batch = sample_batch();
        store.insert_batch(&batch).unwrap();

        let err = store.update_state(&batch.id, BatchState::Qa).unwrap_err();
        assert_eq!(err.code(), "state_transition_error");

        let updated = store.update_state(&batch.id, BatchState::Seeded).unwrap();
        assert_eq!(updated.state, BatchState::Seeded);

        // Persisted, not just returned
        let loaded = store.get_batch(&batch.id).unwrap().unwrap();
        assert_eq!(loaded.state, BatchState::Seeded);
    }

    #[test]
    fn test_update_state_missing_batch_is_not_found() {
        let store = store();
        let err = store
            .update_state("missing", BatchState::Seeded)
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_list_batches_archived_filter() {
        let store = store();
        let a = sample_batch();
        let b = sample_batch();
        store.insert_batch(&a).unwrap();
        store.insert_batch(&b).unwrap();
        store.set_archived(&b.id, true).unwrap();

        let active = store
            .list_batches(&BatchFilter::new().with_archived(false))
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);

        let all = store.list_batches(&BatchFilter::new()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_insert_posts_is_atomic() {
        let store = store();
        let batch = sample_batch();
        store.insert_batch(&batch).unwrap();

        let first = sample_post(&batch.id);
        let mut duplicate = sample_post(&batch.id);
        duplicate.id = first.id.clone();

        let result = store.insert_posts(&[first, duplicate]);
        assert!(result.is_err());
        assert!(store.list_posts(&batch.id).unwrap().is_empty());
    }

    #[test]
    fn test_post_round_trip_and_update() {
        let store = store();
        let batch = sample_batch();
        store.insert_batch(&batch).unwrap();
        let post = sample_post(&batch.id);
        store.insert_posts(std::slice::from_ref(&post)).unwrap();

        let mut loaded = store.get_post(&post.id).unwrap().unwrap();
        assert_eq!(loaded.topic_title, "Hydration myths");

        loaded.video_status = VideoStatus::Submitted;
        loaded.video_operation_id = Some("op-1".into());
        let updated = store.update_post(&loaded).unwrap();
        assert!(updated.updated_at >= post.updated_at);

        let reloaded = store.get_post(&post.id).unwrap().unwrap();
        assert_eq!(reloaded.video_status, VideoStatus::Submitted);
        assert_eq!(reloaded.video_operation_id.as_deref(), Some("op-1"));
    }

    #[test]
    fn test_update_post_normalizes_queued_to_submitted() {
        let store = store();
        let batch = sample_batch();
        store.insert_batch(&batch).unwrap();
        let mut post = sample_post(&batch.id);
        store.insert_posts(std::slice::from_ref(&post)).unwrap();

        post.video_status = VideoStatus::Queued;
        let updated = store.update_post(&post).unwrap();
        assert_eq!(updated.video_status, VideoStatus::Submitted);
    }

    #[test]
    fn test_list_posts_by_video_status() {
        let store = store();
        let batch = sample_batch();
        store.insert_batch(&batch).unwrap();

        let pending = sample_post(&batch.id);
        let mut submitted = sample_post(&batch.id);
        submitted.video_status = VideoStatus::Submitted;
        store
            .insert_posts(&[pending.clone(), submitted.clone()])
            .unwrap();

        let active = store
            .list_posts_by_video_status(&[VideoStatus::Submitted, VideoStatus::Processing])
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, submitted.id);

        assert!(store.list_posts_by_video_status(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_topic_upsert_increments_use_count() {
        let store = store();
        let fields = TopicFields::new("Morning hydration", "education", "drink up today");

        let first = store.upsert_topic(&fields).unwrap();
        assert_eq!(first.use_count, 1);

        // Title match is case-insensitive
        let again =
            store.upsert_topic(&TopicFields::new("morning HYDRATION", "other", "other")).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.use_count, 2);

        let all = store.all_topics().unwrap();
        assert_eq!(all.len(), 1);
    }
}
