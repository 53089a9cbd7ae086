use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use super::{
    services::{gateway, health, stats},
    state::AppState,
};
use crate::cache::Cache;
use crate::config::Config;
use crate::dispatch::{Dispatcher, HttpConfig, HttpTransport};
use crate::ledger::LedgerStore;
use crate::observability::Metrics;
use crate::recorder::Recorder;
use crate::registry::SourceRegistry;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
    let address = address.unwrap_or(config.server.bind_addr);

    // Backend selection happens once here; degraded in-process mode persists
    // for the process lifetime
    let cache = Cache::connect(&config.cache).await;
    info!(backend = cache.backend_name(), "Cache backend selected");

    info!(path = %config.ledger.path.display(), "Opening ledger");
    let store = Arc::new(
        LedgerStore::open(&config.ledger.path)
            .map_err(|e| format!("Failed to open ledger: {}", e))?,
    );

    let registry = Arc::new(
        SourceRegistry::from_config(&config)
            .map_err(|e| format!("Failed to build source registry: {}", e))?,
    );

    let recorder = Arc::new(Recorder::new(Arc::clone(&store)));
    let metrics = Arc::new(Metrics::new());

    let transport = Arc::new(
        HttpTransport::new(HttpConfig::default())
            .map_err(|e| format!("Failed to build HTTP transport: {}", e))?,
    );

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        cache.clone(),
        transport,
        Arc::clone(&recorder),
        Arc::clone(&metrics),
        &config.limits,
    ));

    let state = AppState {
        config: Arc::new(config),
        registry,
        dispatcher,
        store,
        recorder,
        metrics,
        cache_backend: cache.backend_name(),
    };

    let app = build_router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "Gateway listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Operational routes first; everything else falls through to the gateway
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .fallback(get(gateway))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
