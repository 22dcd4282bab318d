use anyhow::{bail, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which `TrafficStore` implementation a binary should run against.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{}', expected postgres or memory", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;
        let db_max_connections = env_or("DB_MAX_CONNECTIONS", 50);
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            bind_addr,
            store_backend,
            database_url: database_url(),
            db_max_connections,
            log_level,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    pub api_base: String,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub db_max_connections: u32,
    pub vehicle_count: usize,
    pub tick_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub push_timeout_ms: u64,
    pub push_max_attempts: u32,
    pub push_retry_backoff_ms: u64,
    pub push_concurrency: usize,
    pub seed: Option<u64>,
    pub log_level: String,
}

impl SimulatorConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let api_base =
            env::var("API_BASE").unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string());
        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;
        let seed = env::var("SIM_SEED").ok().and_then(|s| s.parse().ok());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            store_backend,
            database_url: database_url(),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5),
            vehicle_count: env_or("NUM_VEHICLES", 100),
            tick_interval_secs: env_or("TICK_INTERVAL_SECS", 2),
            error_backoff_secs: env_or("ERROR_BACKOFF_SECS", 2),
            push_timeout_ms: env_or("PUSH_TIMEOUT_MS", 2000),
            push_max_attempts: env_or::<u32>("PUSH_MAX_ATTEMPTS", 2).max(1),
            push_retry_backoff_ms: env_or("PUSH_RETRY_BACKOFF_MS", 200),
            push_concurrency: env_or::<usize>("PUSH_CONCURRENCY", 8).max(1),
            seed,
            log_level,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

fn database_url() -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        return url;
    }

    let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "traffic".to_string());
    let db_user = env::var("DB_USER").unwrap_or_else(|_| "traffic".to_string());
    let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "traffic".to_string());

    format!(
        "postgres://{}:{}@{}:{}/{}",
        db_user, db_pwd, db_host, db_port, db_name
    )
}

/// Reads a numeric variable, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
