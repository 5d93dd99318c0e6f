//! Identity Service
//!
//! Maps an anonymous browser id to a stable generated username and color.

use identity_service::config::{Config, StoreBackend};
use identity_service::errors::IdentityError;
use identity_service::observability::metrics::init_metrics_recorder;
use identity_service::repositories::{IdentityStore, InMemoryIdentityStore, RedisIdentityStore};
use identity_service::routes::{self, AppState};
use identity_service::services::IdentityResolver;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Identity Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        collection = %config.collection,
        write_mode = ?config.write_mode,
        request_timeout_seconds = config.request_timeout_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let store = connect_store(&config).await?;

    let resolver = Arc::new(IdentityResolver::new(store, config.write_mode));

    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState { config, resolver });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Identity Service listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain_seconds))
        .await?;

    info!("Identity Service shutdown complete");

    Ok(())
}

/// Build the configured document store.
async fn connect_store(config: &Config) -> Result<Arc<dyn IdentityStore>, IdentityError> {
    match config.store_backend {
        StoreBackend::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                IdentityError::Internal("REDIS_URL is required for the redis backend".to_string())
            })?;

            info!("Connecting to redis...");
            let store = RedisIdentityStore::connect(redis_url, &config.collection)
                .await
                .map_err(|e| {
                    error!("Failed to connect to redis: {}", e);
                    e
                })?;
            info!("Redis connection established");

            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; identities will not survive a restart");
            Ok(Arc::new(InMemoryIdentityStore::new()))
        }
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
