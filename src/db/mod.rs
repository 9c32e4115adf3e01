mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_demo_packages;

use anyhow::Result;
use sqlx::any::AnyPoolOptions;
use std::time::Duration;
use tracing::{error, info};

use crate::config::{DatabaseSettings, PoolConfig};

/// Connection pool over the `Any` driver: MySQL in production, SQLite for
/// local runs and tests.
pub type DbPool = sqlx::AnyPool;

/// Message shown to callers when the database is unreachable. The underlying
/// cause is logged, never returned.
pub const CONNECTION_FAILED_MESSAGE: &str = "Database connection failed. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{}", CONNECTION_FAILED_MESSAGE)]
    ConnectionFailed,
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

/// Open a pool for the configured database.
pub async fn connect(settings: &DatabaseSettings, pool: &PoolConfig) -> Result<DbPool, DbError> {
    let url = settings.url()?;
    info!(database = %settings.redacted_url(), "Connecting to database");
    connect_url(&url, pool).await
}

/// Open a pool for an explicit `mysql://` or `sqlite:` URL.
pub async fn connect_url(url: &str, pool: &PoolConfig) -> Result<DbPool, DbError> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(pool.max_connections)
        .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs))
        .connect(url)
        .await
        .map_err(|e| {
            error!("Database connection failed: {}", e);
            DbError::ConnectionFailed
        })
}

/// Round-trip a trivial query. Errors are logged and reported as `false`.
pub async fn test_connection(pool: &DbPool) -> bool {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => true,
        Err(e) => {
            error!("Database connection test failed: {}", e);
            false
        }
    }
}

/// Execute a SQL migration file. Comment lines are dropped before splitting
/// on `;` so punctuation inside comments never starts a statement.
async fn execute_sql(pool: &DbPool, sql: &str) -> Result<()> {
    let cleaned: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    for statement in cleaned.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: packages, users, sessions, inquiries
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    info!("Migrations completed");
    Ok(())
}

/// Connect, migrate and optionally seed the demo catalogue.
pub async fn init(settings: &DatabaseSettings, pool_config: &PoolConfig) -> Result<DbPool> {
    let pool = connect(settings, pool_config).await?;
    run_migrations(&pool).await?;

    if pool_config.seed_demo_data {
        seed_demo_packages(&pool).await?;
    }

    info!("Database initialized successfully");
    Ok(pool)
}

/// Fresh in-memory SQLite database with the schema applied.
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    sqlx::any::install_default_drivers();

    // One connection that never recycles, otherwise the in-memory database is lost
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
