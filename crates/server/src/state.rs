use std::sync::Arc;

use reelforge_core::batch::BatchOps;
use reelforge_core::cdn::CdnUploader;
use reelforge_core::research::ResearchOrchestrator;
use reelforge_core::video::{RecoveryLog, VideoPoller, VideoProviders};
use reelforge_core::{BatchStore, Config, PostStore, SanitizedConfig, TopicRegistry};

/// Shared application state.
pub struct AppState {
    config: Config,
    batches: Arc<dyn BatchStore>,
    posts: Arc<dyn PostStore>,
    registry: Arc<dyn TopicRegistry>,
    ops: BatchOps,
    orchestrator: Arc<ResearchOrchestrator>,
    providers: VideoProviders,
    cdn: Option<Arc<dyn CdnUploader>>,
    recovery: RecoveryLog,
    poller: Option<Arc<VideoPoller>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        batches: Arc<dyn BatchStore>,
        posts: Arc<dyn PostStore>,
        registry: Arc<dyn TopicRegistry>,
        orchestrator: Arc<ResearchOrchestrator>,
        providers: VideoProviders,
        cdn: Option<Arc<dyn CdnUploader>>,
        recovery: RecoveryLog,
        poller: Option<Arc<VideoPoller>>,
    ) -> Self {
        let ops = BatchOps::new(Arc::clone(&batches), Arc::clone(&posts));
        Self {
            config,
            batches,
            posts,
            registry,
            ops,
            orchestrator,
            providers,
            cdn,
            recovery,
            poller,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn batches(&self) -> &Arc<dyn BatchStore> {
        &self.batches
    }

    pub fn posts(&self) -> &Arc<dyn PostStore> {
        &self.posts
    }

    pub fn registry(&self) -> &Arc<dyn TopicRegistry> {
        &self.registry
    }

    pub fn ops(&self) -> &BatchOps {
        &self.ops
    }

    pub fn orchestrator(&self) -> &ResearchOrchestrator {
        &self.orchestrator
    }

    pub fn providers(&self) -> &VideoProviders {
        &self.providers
    }

    pub fn cdn(&self) -> Option<&Arc<dyn CdnUploader>> {
        self.cdn.as_ref()
    }

    pub fn recovery(&self) -> &RecoveryLog {
        &self.recovery
    }

    pub fn poller(&self) -> Option<&Arc<VideoPoller>> {
        self.poller.as_ref()
    }
}
