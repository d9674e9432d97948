//! Daily activity counters and library statistics

use crate::queries::{entries, history, queue};
use crate::DbPool;
use shelfwise_core::{AppError, DailyStats, LibraryStats};
use sqlx::Row;

/// A counter column of `daily_stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Scanned,
    Queued,
    Fixed,
    Verified,
    ApiCalls,
}

impl Counter {
    fn column(&self) -> &'static str {
        match self {
            Counter::Scanned => "scanned",
            Counter::Queued => "queued",
            Counter::Fixed => "fixed",
            Counter::Verified => "verified",
            Counter::ApiCalls => "api_calls",
        }
    }
}

/// Adds `amount` to today's counter
pub async fn bump(pool: &DbPool, counter: Counter, amount: i64) -> Result<(), AppError> {
    if amount == 0 {
        return Ok(());
    }

    sqlx::query("INSERT OR IGNORE INTO daily_stats (date) VALUES (date('now', 'localtime'))")
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to create daily stats row", e))?;

    // Column names come from a closed enum, never from input
    let sql = format!(
        "UPDATE daily_stats SET {col} = {col} + ? WHERE date = date('now', 'localtime')",
        col = counter.column()
    );
    sqlx::query(&sql)
        .bind(amount)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to update daily stats", e))?;

    Ok(())
}

/// Returns today's counters, zeroed if nothing happened yet
pub async fn today(pool: &DbPool) -> Result<DailyStats, AppError> {
    let row = sqlx::query(
        r#"
        SELECT d.date AS date,
               COALESCE(s.scanned, 0) AS scanned,
               COALESCE(s.queued, 0) AS queued,
               COALESCE(s.fixed, 0) AS fixed,
               COALESCE(s.verified, 0) AS verified,
               COALESCE(s.api_calls, 0) AS api_calls
        FROM (SELECT date('now', 'localtime') AS date) d
        LEFT JOIN daily_stats s ON s.date = d.date
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch today's stats", e))?;

    row_to_daily(row)
}

/// Returns the most recent `days` rows, newest first
pub async fn recent_days(pool: &DbPool, days: i64) -> Result<Vec<DailyStats>, AppError> {
    let rows = sqlx::query(
        "SELECT date, scanned, queued, fixed, verified, api_calls \
         FROM daily_stats ORDER BY date DESC LIMIT ?",
    )
    .bind(days)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch daily stats", e))?;

    rows.into_iter().map(row_to_daily).collect()
}

/// Collects entry, history and queue counts
pub async fn library_stats(pool: &DbPool) -> Result<LibraryStats, AppError> {
    Ok(LibraryStats {
        total_entries: entries::count_entries(pool).await?,
        queue_length: queue::queue_length(pool).await?,
        entries_by_status: entries::count_by_status(pool).await?,
        history_by_status: history::count_by_status(pool).await?,
        today: today(pool).await?,
    })
}

/// Deletes every row of every library table, keeping the schema
pub async fn reset_all(pool: &DbPool) -> Result<(), AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::database("Failed to start transaction", e))?;

    for table in ["queue", "history", "entries", "daily_stats"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear {}", table), e))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::database("Failed to commit reset", e))
}

fn row_to_daily(row: sqlx::sqlite::SqliteRow) -> Result<DailyStats, AppError> {
    let get = |name: &str| -> Result<i64, AppError> {
        row.try_get(name)
            .map_err(|e| AppError::database(format!("Missing stats column {}", name), e))
    };

    Ok(DailyStats {
        date: row
            .try_get("date")
            .map_err(|e| AppError::database("Missing stats date", e))?,
        scanned: get("scanned")?,
        queued: get("queued")?,
        fixed: get("fixed")?,
        verified: get("verified")?,
        api_calls: get("api_calls")?,
    })
}
