// Main entry point - Dependency injection, poller and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::direction_resolver::ConfiguredResolver;
use crate::application::history_cache::HistoryCache;
use crate::application::history_store::HistoryStore;
use crate::application::tracking_service::{run_poller, TrackingService};
use crate::infrastructure::config::{load_app_config, StoreKind};
use crate::infrastructure::file_store::FileHistoryStore;
use crate::infrastructure::memory_repository::MemoryVehicleRepository;
use crate::infrastructure::memory_store::MemoryHistoryStore;
use crate::infrastructure::provider_client::ProviderClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create stores and adapters (infrastructure layer)
    let history_store: Arc<dyn HistoryStore> = match config.history.store {
        StoreKind::Memory => Arc::new(MemoryHistoryStore::new()),
        StoreKind::File => {
            let store = FileHistoryStore::new(&config.history.directory);
            tracing::info!(directory = %store.directory().display(), "using file history store");
            Arc::new(store)
        }
    };
    let repository = Arc::new(MemoryVehicleRepository::new());
    let provider = Arc::new(ProviderClient::new(config.provider.clone())?);

    // Create services (application layer)
    let cache = HistoryCache::new(history_store, config.history.size, config.history.timeout());
    let resolver = Arc::new(ConfiguredResolver::new(
        config.tracking.strategy,
        config.tracking.strategy_overrides.clone(),
        cache,
    ));
    let tracking = Arc::new(TrackingService::new(
        provider,
        resolver,
        repository.clone(),
        config.tracking.workers,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let poller = tokio::spawn(run_poller(tracking, config.tracking.update_interval(), shutdown_rx));

    // Build router (presentation layer)
    let state = Arc::new(AppState { repository });
    let app = router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, strategy = ?config.tracking.strategy, "starting bus-sense service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // without a signal handler the service runs until killed
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            let _ = shutdown_tx.send(true);
        })
        .await?;

    poller.await?;
    Ok(())
}
