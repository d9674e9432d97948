//! Database connection management

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use shelfwise_core::AppError;

/// Database connection pool
pub type DbPool = Pool<Sqlite>;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Enable Write-Ahead Logging (WAL) mode
    pub enable_wal: bool,
    /// Create database if it doesn't exist
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "shelfwise.db".to_string(),
            max_connections: 10,
            enable_wal: true,
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    /// Creates a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the maximum number of connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Enables or disables WAL mode
    pub fn with_wal(mut self, enable: bool) -> Self {
        self.enable_wal = enable;
        self
    }

    /// Sets whether to create the database if missing
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// Establishes a connection pool to the database
///
/// Foreign keys are switched on per connection so queue and history rows
/// follow their entry.
pub async fn connect(config: DatabaseConfig) -> Result<DbPool, AppError> {
    let mut options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))
        .map_err(|e| AppError::database("Invalid database path", e))?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    // Configure WAL mode for better concurrency
    if config.enable_wal {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database("Failed to connect to database", e))?;

    log::debug!("Opened database at {}", config.path);
    Ok(pool)
}

/// Creates a migrated in-memory database, used by tests across the workspace
///
/// Single connection that never idles out, so every query sees the same
/// memory database.
pub async fn create_test_db() -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| AppError::database("Failed to create test database", e))?
        .journal_mode(SqliteJournalMode::Memory)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database("Failed to connect to test database", e))?;

    crate::migrations::run_migrations(&pool).await?;
    Ok(pool)
}

/// Closes the database connection pool
pub async fn close(pool: DbPool) {
    pool.close().await;
}

/// Checks if the database file exists
pub fn database_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}
