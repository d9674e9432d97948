//! Shelfwise Database Layer
//!
//! SQLite persistence for library entries, the work queue, rename history,
//! daily counters and the local name database, using sqlx.

pub mod connection;
pub mod migrations;
pub mod queries;

pub use connection::{connect, create_test_db, DatabaseConfig, DbPool};
pub use migrations::{current_version, optimize, run_migrations, verify_integrity};

/// Opens the database at `path` and brings its schema up to date
pub async fn open(path: &std::path::Path) -> Result<DbPool, shelfwise_core::AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| shelfwise_core::AppError::io_at(parent, e))?;
        }
    }

    let pool = connect(DatabaseConfig::new(path.to_string_lossy())).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
