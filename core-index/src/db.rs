//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling for the persisted media index.
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for better concurrency (multiple readers, one writer)
//! - **Connection Pooling**: Configurable min/max connections with timeouts
//! - **Foreign Keys**: Enforced for referential integrity
//! - **Automatic Migrations**: Runs on initialization
//! - **Health Checks**: Connection validation
//!
//! ## Testing
//!
//! For tests, use in-memory databases:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::{IndexError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or `:memory:` for an in-memory database
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a new configuration pointing at the given database file
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// Pinned to a single connection: every pool connection would otherwise
    /// open its own empty in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function:
/// 1. Configures SQLite connection options (WAL mode, foreign keys, etc.)
/// 2. Creates a connection pool with the specified configuration
/// 3. Runs database migrations
/// 4. Performs a health check
///
/// # Errors
///
/// Returns an error if the database file cannot be accessed, pool creation
/// fails, migrations fail, or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(IndexError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true);

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            IndexError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create a connection pool for testing with an in-memory database,
/// migrations already applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    let config = DatabaseConfig::in_memory();
    create_pool(config).await
}

/// Run database migrations
///
/// Applies all pending migrations from the `migrations/` directory; the
/// migrations are embedded in the binary at compile time.
async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            IndexError::Migration(e.to_string())
        })?;

    info!("Database migrations completed");
    Ok(())
}

/// Perform a health check on the connection pool
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Performing database health check");

    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        IndexError::Database(e)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(config).await;
        assert!(pool.is_ok(), "Should create in-memory pool successfully");
    }

    #[tokio::test]
    async fn test_database_config_builder() {
        let config = DatabaseConfig::in_memory()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(60));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "Foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = create_test_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='media_items'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(result.0, 1, "media_items table should exist");

        let result: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='scan_metadata'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(result.0, 1, "scan_metadata table should exist");
    }
}
