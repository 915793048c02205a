//! # Database Connection Pool Module
//!
//! SQLite connection pooling for the library cache.
//!
//! ## Features
//!
//! - **WAL Mode**: readers keep working while a sync commits
//! - **Connection Pooling**: configurable min/max connections with timeouts
//! - **Automatic Migrations**: embedded with `sqlx::migrate!` and run on open
//! - **Health Checks**: a trivial query before the pool is handed out
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("library.db")).await?;
//! ```
//!
//! ## Testing
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```
//!
//! Every connection to `sqlite::memory:` opens its own empty database, so the
//! in-memory configuration pins the pool to a single connection that is never
//! recycled.

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:` URL of the database
    pub database_url: String,

    pub min_connections: u32,

    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    pub max_lifetime: Option<Duration>,

    pub idle_timeout: Option<Duration>,

    /// Number of prepared statements cached per connection
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Configuration for a database file, created if missing.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)),
            idle_timeout: Some(Duration::from_secs(600)),
            statement_cache_capacity: 100,
        }
    }

    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
            statement_cache_capacity: 100,
        }
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
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
/// 1. Configures SQLite connection options (WAL mode, synchronous NORMAL)
/// 2. Creates the pool
/// 3. Runs migrations
/// 4. Performs a health check
///
/// # Errors
///
/// `LibraryError::Database` if the database cannot be opened,
/// `LibraryError::Migration` if the schema cannot be applied.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true)
        .statement_cache_capacity(config.statement_cache_capacity);

    let max_connections = if config.is_in_memory() {
        1
    } else {
        config.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections.min(max_connections))
        .max_connections(max_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            LibraryError::Database(e)
        })?;

    debug!(connections = pool.size(), "Database connection pool created");

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// In-memory pool with migrations applied.
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    Ok(())
}

/// Verify the pool can serve a query.
pub async fn health_check(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        LibraryError::Database(e)
    })?;

    debug!("Database health check passed");
    Ok(())
}
