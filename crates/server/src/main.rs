use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relaypost_core::{
    load_config, testing::MockPublisher, validate_config, AggregatorPublisher, FfmpegTranscoder,
    JobOrchestrator, JobStore, PublisherRegistry, SqliteJobStore, Transcoder,
};

use relaypost_server::api::create_router;
use relaypost_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

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
    let config_path = std::env::var("RELAYPOST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully (version {})", VERSION);
    info!("Database path: {:?}", config.database.path);

    // Log a config hash so deployments can tell configs apart without
    // leaking their contents
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Config hash: {}", &config_hash[..16]);

    // Create SQLite job store
    let store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Create ffmpeg transcoder
    let transcoder = Arc::new(FfmpegTranscoder::new(config.transcoder.clone()));
    if let Err(e) = transcoder.validate().await {
        warn!("Transcoder validation failed, media processing will fail: {}", e);
    }

    // Create publisher registry
    let mut registry = PublisherRegistry::new();
    if let Some(aggregator_config) = &config.aggregator {
        info!(
            "Initializing aggregator publisher at {}",
            aggregator_config.base_url
        );
        registry.set_fallback(Arc::new(AggregatorPublisher::new(aggregator_config.clone())));
    } else {
        warn!("No aggregator configured, falling back to the mock publisher");
        registry.set_fallback(Arc::new(MockPublisher::succeeding("mock")));
    }
    let registry = Arc::new(registry);

    // Create orchestrator
    let orchestrator = Arc::new(JobOrchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&store),
        transcoder,
        registry,
        Arc::new(config.effective_constraints()),
    ));

    if config.orchestrator.enabled {
        orchestrator.start().await;
        info!("Job orchestrator started");
    } else {
        info!("Orchestrator disabled in config");
    }

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::clone(&orchestrator),
    ));
    let app = create_router(state);

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

    // Stop orchestrator if running
    info!("Server shutting down...");
    orchestrator.stop().await;
    info!("Orchestrator stopped");

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
