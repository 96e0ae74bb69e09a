mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelforge_core::cdn::{CdnUploader, ImageKitClient};
use reelforge_core::config::LlmProvider;
use reelforge_core::llm::{AnthropicClient, OpenAiClient, TextGenerator};
use reelforge_core::research::ResearchOrchestrator;
use reelforge_core::video::{
    RecoveryLog, SoraClient, VeoClient, VideoPoller, VideoProviderKind, VideoProviders,
};
use reelforge_core::{
    load_config, validate_config, BatchStore, PostStore, SqliteStore, TopicRegistry,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("REELFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("LLM provider: {:?}", config.llm.provider);
    info!("Database path: {:?}", config.database.path);

    // Create the SQLite store; one connection serves all three traits
    let store = Arc::new(
        SqliteStore::new(&config.database.path).context("Failed to open the sqlite store")?,
    );
    let batches: Arc<dyn BatchStore> = store.clone();
    let posts: Arc<dyn PostStore> = store.clone();
    let registry: Arc<dyn TopicRegistry> = store;
    info!("Store initialized");

    // Create the text generation client
    let llm: Arc<dyn TextGenerator> = match config.llm.provider {
        LlmProvider::Openai => Arc::new(OpenAiClient::new(&config.llm.api_key, &config.llm.model)),
        LlmProvider::Anthropic => {
            Arc::new(AnthropicClient::new(&config.llm.api_key, &config.llm.model))
        }
    };
    info!(
        "Using text generator: {} ({})",
        llm.provider(),
        llm.model()
    );
    let orchestrator = Arc::new(ResearchOrchestrator::new(llm));

    // Create video providers from the configured keys
    let mut providers = VideoProviders::new();
    if let Some(ref key) = config.video.openai_api_key {
        info!("Initializing Sora video providers");
        providers = providers
            .with(Arc::new(SoraClient::new(key, VideoProviderKind::Sora2)))
            .with(Arc::new(SoraClient::new(key, VideoProviderKind::Sora2Pro)));
    }
    if let Some(ref key) = config.video.gemini_api_key {
        info!("Initializing Veo video provider");
        providers = providers.with(Arc::new(VeoClient::new(key)));
    }
    if providers.is_empty() {
        info!("No video providers configured");
    }

    // Create CDN uploader if configured
    let cdn: Option<Arc<dyn CdnUploader>> = match &config.cdn {
        Some(cdn_config) => {
            info!("Initializing ImageKit uploader");
            let mut client = ImageKitClient::new(&cdn_config.imagekit_private_key);
            if let Some(ref folder) = cdn_config.folder {
                client = client.with_folder(folder);
            }
            Some(Arc::new(client))
        }
        None => {
            info!("No CDN configured");
            None
        }
    };

    // Recovery log for paid submissions that missed their store write
    let recovery = RecoveryLog::new(&config.video.recovery_dir);

    // Replay pending recovery records, then start the background poller
    let poller = match (&cdn, providers.is_empty()) {
        (Some(cdn), false) => {
            match recovery.replay(&providers, cdn, &posts).await {
                Ok(summary) if summary.total_records > 0 => {
                    info!(
                        recovered = summary.recovered,
                        still_processing = summary.still_processing,
                        failed = summary.failed,
                        "startup recovery replay finished"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("Startup recovery replay failed: {}", e),
            }

            let poller = Arc::new(
                VideoPoller::new(Arc::clone(&posts), providers.clone(), Arc::clone(cdn))
                    .with_interval(Duration::from_secs(config.video.poll_interval_secs)),
            );
            poller.start();
            info!(
                interval_secs = config.video.poll_interval_secs,
                "Video poller started"
            );
            Some(poller)
        }
        _ => {
            info!("Video poller disabled (requires a video provider and a CDN)");
            None
        }
    };

    // Create app state
    let app_state = Arc::new(AppState::new(
        config.clone(),
        batches,
        posts,
        registry,
        orchestrator,
        providers,
        cdn,
        recovery,
        poller.clone(),
    ));

    // Create router
    let app = create_router(app_state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop poller if running
    if let Some(ref poller) = poller {
        info!("Stopping video poller...");
        poller.stop();
        info!("Video poller stopped");
    }

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
