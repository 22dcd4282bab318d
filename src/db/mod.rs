use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;

pub mod queries;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Creates the tables if they are missing. Safe to run on every start.
pub async fn ensure_schema(pool: &DbPool) -> Result<()> {
    for statement in queries::SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema ready ({} statements)", queries::SCHEMA.len());
    Ok(())
}
