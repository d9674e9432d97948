//! Database migrations

use crate::DbPool;
use shelfwise_core::AppError;

/// Migration 001: entries, queue, history, stats and the local name tables
const MIGRATION_001: &str = include_str!("../migrations/001_initial_schema.sql");

/// Current database schema version
pub const CURRENT_VERSION: i64 = 1;

/// Returns the current migration version
pub fn current_version() -> i64 {
    CURRENT_VERSION
}

/// Runs all pending migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to create migrations table", e))?;

    run_migration(pool, 1, MIGRATION_001).await?;

    Ok(())
}

/// Runs a single migration if not already applied
async fn run_migration(pool: &DbPool, version: i64, sql: &str) -> Result<(), AppError> {
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?")
            .bind(version)
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::database("Failed to check migration status", e))?;

    if applied.is_some() {
        return Ok(());
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::database("Failed to start migration transaction", e))?;

    sqlx::query(sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to run migration {}", version), e))?;

    sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to record migration {}", version), e))?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit migration {}", version), e))?;

    log::info!("Applied database migration {}", version);
    Ok(())
}

/// Verifies database integrity
pub async fn verify_integrity(pool: &DbPool) -> Result<(), AppError> {
    let result: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to check integrity", e))?;

    if result != "ok" {
        return Err(AppError::database(
            format!("Database integrity check failed: {}", result),
            std::io::Error::other("Integrity check failed"),
        ));
    }

    Ok(())
}

/// Optimizes the database
pub async fn optimize(pool: &DbPool) -> Result<(), AppError> {
    sqlx::query("PRAGMA optimize")
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to optimize database", e))?;

    Ok(())
}
