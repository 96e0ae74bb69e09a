//! Mock video generator for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::video::{PollStatus, SubmitOptions, VideoGenerator, VideoProviderKind};

/// Mock implementation of the [`VideoGenerator`] trait.
///
/// Behaves as one fixed provider. Submissions return a configured operation
/// id, polls return a configured status (or error) every time, downloads
/// return configured bytes. Submitted prompts are recorded for assertions.
#[derive(Debug)]
pub struct MockVideoGenerator {
    kind: VideoProviderKind,
    operation_id: String,
    poll_status: PollStatus,
    poll_error: Option<CoreError>,
    download_bytes: Vec<u8>,
    submissions: Mutex<Vec<(String, SubmitOptions)>>,
}

impl MockVideoGenerator {
    pub fn new(kind: VideoProviderKind) -> Self {
        Self {
            kind,
            operation_id: "mock-op-1".to_string(),
            poll_status: PollStatus::default(),
            poll_error: None,
            download_bytes: vec![0u8; 8],
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Operation id returned by `submit`.
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = operation_id.into();
        self
    }

    /// Status returned by every `poll`.
    pub fn with_poll_status(mut self, status: PollStatus) -> Self {
        self.poll_status = status;
        self
    }

    /// Error returned by every `poll`, overriding the status.
    pub fn with_poll_error(mut self, error: CoreError) -> Self {
        self.poll_error = Some(error);
        self
    }

    /// Bytes returned by `download`.
    pub fn with_download_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.download_bytes = bytes;
        self
    }

    /// Recorded (prompt, options) pairs in submission order.
    pub fn submissions(&self) -> Vec<(String, SubmitOptions)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoGenerator for MockVideoGenerator {
    fn provider(&self) -> VideoProviderKind {
        self.kind
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> Result<String, CoreError> {
        self.submissions
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        Ok(self.operation_id.clone())
    }

    async fn poll(&self, _operation_id: &str) -> Result<PollStatus, CoreError> {
        if let Some(error) = &self.poll_error {
            return Err(error.clone());
        }
        Ok(self.poll_status.clone())
    }

    async fn download(&self, _asset_ref: &str) -> Result<Vec<u8>, CoreError> {
        Ok(self.download_bytes.clone())
    }
}
