use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use traffic_monitor::api::{router, AppState};
use traffic_monitor::config::{AppConfig, StoreBackend};
use traffic_monitor::db;
use traffic_monitor::store::{MemoryStore, PgStore, TrafficStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Traffic Monitor API...");

    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
            info!("Connected to database");
            db::ensure_schema(&pool).await?;
            serve(&config, PgStore::new(pool)).await
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, data is lost on exit");
            serve(&config, MemoryStore::new()).await
        }
    }
}

async fn serve<S: TrafficStore>(config: &AppConfig, store: S) -> Result<()> {
    let app = router(AppState::new(Arc::new(store)));
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
