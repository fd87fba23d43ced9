//! Safisaana Service - marketplace checkout, webhooks and catalogue API
//!
//! This is the main entry point for the safisaana service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safisaana_core::UserId;
use safisaana_service::{create_router, AppState, ServiceConfig, StoreBackend};
use safisaana_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,safisaana=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Safisaana Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = %config.store_backend,
        app_url = %config.app_url,
        intasend_configured = %config.intasend_secret_key.is_some(),
        intasend_test_mode = %config.intasend_test_mode,
        unknown_state_policy = ?config.unknown_state_policy,
        auth_configured = %config.auth_jwks_url.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    for raw in &config.admin_user_ids {
        let user_id: UserId = raw.parse()?;
        store.grant_admin(&user_id).await?;
        tracing::info!(user_id = %user_id, "Admin marker granted");
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store - data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres store backend")?;
            tracing::info!("Connecting to PostgreSQL store");
            Arc::new(PgStore::connect(url).await?)
        }
        StoreBackend::RocksDb => open_rocks(config)?,
    };
    Ok(store)
}

#[cfg(feature = "rocksdb-backend")]
fn open_rocks(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store: Arc<dyn Store> = Arc::new(safisaana_store::RocksStore::open(&config.data_dir)?);
    Ok(store)
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_rocks(_config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    Err("this build has no RocksDB support; rebuild with --features rocksdb-backend".into())
}
