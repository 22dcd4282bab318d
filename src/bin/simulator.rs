use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use traffic_monitor::config::{SimulatorConfig, StoreBackend};
use traffic_monitor::db;
use traffic_monitor::simulator::network::{default_roads, SIGNAL_SITES};
use traffic_monitor::simulator::signals::init_signals;
use traffic_monitor::simulator::{
    run, EventInjector, EventParams, Fleet, MotionParams, PositionPublisher, RetryPolicy, Simulation,
};
use traffic_monitor::store::{MemoryStore, PgStore, TrafficStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = SimulatorConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting traffic simulator...");
    info!("API: {}", config.api_base);

    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
            info!("Connected to database");
            db::ensure_schema(&pool).await?;
            simulate(&config, PgStore::new(pool)).await
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, events will not reach a separate API process");
            simulate(&config, MemoryStore::new()).await
        }
    }
}

async fn simulate<S: TrafficStore>(config: &SimulatorConfig, store: S) -> Result<()> {
    let store = Arc::new(store);
    init_signals(store.as_ref(), &SIGNAL_SITES).await?;

    let mut rng = match config.seed {
        Some(seed) => {
            info!("Seed: {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };
    let fleet = Fleet::spawn(default_roads(), config.vehicle_count, MotionParams::default(), &mut rng)?;
    let injector = EventInjector::new(EventParams::default())?;

    let publisher = PositionPublisher::new(
        &config.api_base,
        Duration::from_millis(config.push_timeout_ms),
        RetryPolicy {
            max_attempts: config.push_max_attempts,
            backoff: Duration::from_millis(config.push_retry_backoff_ms),
        },
        config.push_concurrency,
    )?;

    let sim = Simulation::new(store, fleet, injector, rng);
    run(sim, publisher, config.tick_interval(), config.error_backoff()).await
}
