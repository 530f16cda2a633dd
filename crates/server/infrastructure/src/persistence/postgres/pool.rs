//! PostgreSQL Connection Pool
//!
//! One pool is created at startup and shared by every handler task through
//! [`PgExecutor`](super::PgExecutor).
//!
//! # Usage
//!
//! ```ignore
//! use todo_processor_infrastructure::persistence::{DatabasePool, DatabasePoolConfig};
//!
//! let pool = DatabasePool::new(&config.database.url, DatabasePoolConfig::from(&config.database)).await?;
//! let executor = PgExecutor::new(pool.pg_pool());
//! ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;
use todoflow_shared::config::DatabaseConfig;
use tracing::info;

/// Database pool configuration
#[derive(Debug, Clone)]
pub struct DatabasePoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection acquisition timeout
    pub connection_timeout: Duration,
    /// Idle connection lifetime
    pub idle_timeout: Duration,
    /// Maximum connection lifetime
    pub max_lifetime: Duration,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600), // 10 minutes
            max_lifetime: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl DatabasePoolConfig {
    #[inline]
    pub fn new(max_connections: u32, connection_timeout_secs: u64) -> Self {
        Self {
            max_connections,
            connection_timeout: Duration::from_secs(connection_timeout_secs),
            ..Self::default()
        }
    }
}

impl From<&DatabaseConfig> for DatabasePoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self::new(config.pool_size, config.connect_timeout_secs)
    }
}

/// Shared PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new database pool with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created (e.g., invalid URL,
    /// database unreachable).
    pub async fn new(url: &str, config: DatabasePoolConfig) -> Result<Self, PoolError> {
        info!(
            max_connections = config.max_connections,
            timeout = ?config.connection_timeout,
            "Creating PostgreSQL pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(url)
            .await
            .map_err(|e| PoolError::ConnectionFailed(e.to_string()))?;

        info!("PostgreSQL pool created successfully");

        Ok(Self { pool })
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Clone the inner `PgPool`
    #[inline]
    pub fn pg_pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Closes every connection; waits for checked-out ones to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}

/// Errors that can occur when working with the database pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),
}
