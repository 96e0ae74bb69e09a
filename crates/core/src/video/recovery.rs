//! Write-ahead recovery log for paid video submissions.
//!
//! A provider submission costs money the moment it is accepted. If the store
//! write after a successful submit fails, the operation id would be lost and
//! the video unrecoverable. The recovery log captures that id in an
//! append-only JSONL file so a replay can finish the job later.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cdn::CdnUploader;
use crate::error::CoreError;
use crate::metrics::RECOVERY_RECORDS;
use crate::store::{require_post, PostStore};

use super::poller::store_completed_video;
use super::types::VideoProviderKind;
use super::VideoProviders;

/// One recovery entry, written after a paid submit whose store write failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoveryRecord {
    pub timestamp: DateTime<Utc>,
    pub post_id: String,
    pub operation_id: String,
    pub provider: VideoProviderKind,
    pub correlation_id: String,
    pub status: String,
}

impl RecoveryRecord {
    pub fn db_update_failed(
        post_id: impl Into<String>,
        operation_id: impl Into<String>,
        provider: VideoProviderKind,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            post_id: post_id.into(),
            operation_id: operation_id.into(),
            provider,
            correlation_id: correlation_id.into(),
            status: "db_update_failed".to_string(),
        }
    }
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoverySummary {
    pub total_records: usize,
    pub recovered: usize,
    pub still_processing: usize,
    pub failed: usize,
}

/// Date-partitioned JSONL appender and replayer.
pub struct RecoveryLog {
    dir: PathBuf,
}

impl RecoveryLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for_today(&self) -> PathBuf {
        self.dir
            .join(format!("video_recovery_{}.jsonl", Utc::now().format("%Y%m%d")))
    }

    /// Append one record to today's file. Creates the directory on demand.
    pub fn append(&self, record: &RecoveryRecord) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| CoreError::Internal(format!("recovery dir create: {}", e)))?;

        let line = serde_json::to_string(record)?;
        let path = self.file_for_today();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CoreError::Internal(format!("recovery log open: {}", e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| CoreError::Internal(format!("recovery log write: {}", e)))?;

        RECOVERY_RECORDS.inc();
        error!(
            post_id = %record.post_id,
            operation_id = %record.operation_id,
            provider = %record.provider,
            path = %path.display(),
            "recovery record written for paid video"
        );
        Ok(())
    }

    /// All recovery files in the log directory, oldest first.
    pub fn files(&self) -> Result<Vec<PathBuf>, CoreError> {
        let mut files = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(CoreError::Internal(format!("recovery dir read: {}", e))),
        };
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::Internal(format!("recovery dir read: {}", e)))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("video_recovery_") && name.ends_with(".jsonl") {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse all records from one file. Blank lines are skipped.
    pub fn read_records(path: &Path) -> Result<Vec<RecoveryRecord>, CoreError> {
        let file = fs::File::open(path)
            .map_err(|e| CoreError::Internal(format!("recovery file open: {}", e)))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| CoreError::Internal(format!("recovery file read: {}", e)))?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// Poll every logged operation and finish the ones that completed.
    ///
    /// Completed jobs run the same download/upload/mark-completed path as the
    /// poller, with a `recovered` marker in the post metadata. Jobs still in
    /// flight are left for the next run.
    pub async fn replay(
        &self,
        providers: &VideoProviders,
        cdn: &Arc<dyn CdnUploader>,
        posts: &Arc<dyn PostStore>,
    ) -> Result<RecoverySummary, CoreError> {
        let mut summary = RecoverySummary::default();

        for path in self.files()? {
            let records = Self::read_records(&path)?;
            summary.total_records += records.len();

            for record in records {
                match Self::replay_one(&record, providers, cdn, posts).await {
                    Ok(true) => summary.recovered += 1,
                    Ok(false) => summary.still_processing += 1,
                    Err(e) => {
                        warn!(
                            post_id = %record.post_id,
                            operation_id = %record.operation_id,
                            error = %e,
                            "recovery replay failed"
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            total = summary.total_records,
            recovered = summary.recovered,
            still_processing = summary.still_processing,
            failed = summary.failed,
            "recovery replay finished"
        );
        Ok(summary)
    }

    async fn replay_one(
        record: &RecoveryRecord,
        providers: &VideoProviders,
        cdn: &Arc<dyn CdnUploader>,
        posts: &Arc<dyn PostStore>,
    ) -> Result<bool, CoreError> {
        let provider = providers.get(record.provider)?;

        let status = provider.poll(&record.operation_id).await?;
        if !status.done {
            info!(
                post_id = %record.post_id,
                operation_id = %record.operation_id,
                status = %status.status,
                "recovered video still processing"
            );
            return Ok(false);
        }
        if status.is_failed() {
            return Err(CoreError::ThirdParty {
                message: format!("provider job failed with status {}", status.status),
                details: serde_json::json!({ "error": status.error }),
            });
        }

        let asset_ref = status
            .asset_ref
            .clone()
            .ok_or_else(|| CoreError::third_party("completed job has no asset reference"))?;
        let bytes = provider.download(&asset_ref).await?;

        let mut post = require_post(posts.as_ref(), &record.post_id)?;
        post.video_operation_id = Some(record.operation_id.clone());
        store_completed_video(
            posts.as_ref(),
            cdn.as_ref(),
            post,
            record.provider,
            bytes,
            status.metadata,
            true,
        )
        .await?;

        info!(
            post_id = %record.post_id,
            operation_id = %record.operation_id,
            "paid video recovered"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecoveryLog::new(dir.path());

        let record =
            RecoveryRecord::db_update_failed("p1", "op1", VideoProviderKind::Sora2Pro, "c1");
        log.append(&record).unwrap();
        log.append(&RecoveryRecord::db_update_failed(
            "p2",
            "op2",
            VideoProviderKind::Veo31,
            "c2",
        ))
        .unwrap();

        let files = log.files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("video_recovery_"));

        let records = RecoveryLog::read_records(&files[0]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].post_id, "p1");
        assert_eq!(records[0].status, "db_update_failed");
        assert_eq!(records[1].provider, VideoProviderKind::Veo31);
    }

    #[test]
    fn test_files_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecoveryLog::new(dir.path().join("nope"));
        assert!(log.files().unwrap().is_empty());
    }

    #[test]
    fn test_read_records_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video_recovery_20260101.jsonl");
        let record =
            RecoveryRecord::db_update_failed("p1", "op1", VideoProviderKind::Sora2, "c1");
        let line = serde_json::to_string(&record).unwrap();
        fs::write(&path, format!("{}\n\n{}\n", line, line)).unwrap();

        let records = RecoveryLog::read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
    }
}
