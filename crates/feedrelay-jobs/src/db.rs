//! Database pool setup
//!
//! The pool is opened once per run and shared read-only by every source
//! unit's step. A connection failure here is run-fatal by design: nothing is
//! processed if the checkpoint store is unreachable.

use std::time::Duration;

use feedrelay_common::{FeedError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Default maximum connections; these jobs are single-threaded, so the pool
/// exists mostly for reconnect handling.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DbConfig {
    /// Load from environment (`DATABASE_URL` is required)
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| FeedError::config("DATABASE_URL not set"))?;

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let connect_timeout_secs = std::env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            url,
            max_connections,
            connect_timeout_secs,
        })
    }
}

/// Open the shared connection pool for a run
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(FeedError::database)?;

    tracing::info!(max_connections = config.max_connections, "Database pool ready");

    Ok(pool)
}
