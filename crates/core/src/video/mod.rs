//! Video generation: provider clients, submission, polling, recovery.

mod poller;
mod recovery;
mod sora;
mod submit;
mod types;
mod veo;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreError;

pub use poller::{PollReport, VideoPoller, DEFAULT_POLL_INTERVAL};
pub use recovery::{RecoveryLog, RecoveryRecord, RecoverySummary};
pub use sora::SoraClient;
pub use submit::{generate_all, submit_video, GenerateAllReport};
pub use types::{
    merge_metadata, AspectRatio, PollStatus, SubmitOptions, VideoGenerator, VideoProviderKind,
    VideoResolution,
};
pub use veo::VeoClient;

/// Registry of configured video providers, keyed by kind.
#[derive(Clone, Default)]
pub struct VideoProviders {
    providers: HashMap<VideoProviderKind, Arc<dyn VideoGenerator>>,
}

impl VideoProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn VideoGenerator>) -> Self {
        self.providers.insert(provider.provider(), provider);
        self
    }

    /// Look up a provider, failing with `Validation` when it is not
    /// configured. Submitting to an unconfigured provider is a caller
    /// mistake, not an upstream outage.
    pub fn get(&self, kind: VideoProviderKind) -> Result<Arc<dyn VideoGenerator>, CoreError> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            CoreError::validation_with(
                format!("video provider {} is not configured", kind),
                serde_json::json!({ "provider": kind.as_str() }),
            )
        })
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockVideoGenerator;

    #[test]
    fn test_registry_lookup() {
        let providers = VideoProviders::new()
            .with(Arc::new(MockVideoGenerator::new(VideoProviderKind::Sora2Pro)));

        assert!(providers.get(VideoProviderKind::Sora2Pro).is_ok());
        let err = providers.get(VideoProviderKind::Veo31).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
