//! Work queue operations

use crate::DbPool;
use shelfwise_core::{AppError, EntryId, QueueId, QueuedEntry, Timestamp, MAX_PRIORITY};
use sqlx::Row;
use std::path::PathBuf;

/// Queues an entry unless it already has an outstanding item
///
/// Returns true if a new item was created.
pub async fn enqueue(
    pool: &DbPool,
    entry_id: EntryId,
    reason: &str,
    priority: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO queue (entry_id, reason, priority, added_at) VALUES (?, ?, ?, ?)",
    )
    .bind(entry_id)
    .bind(reason)
    .bind(priority.clamp(0, MAX_PRIORITY))
    .bind(Timestamp::now().as_millis())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to enqueue entry", e))?;

    Ok(result.rows_affected() > 0)
}

/// Returns up to `limit` queued entries in processing order
pub async fn next_batch(pool: &DbPool, limit: i64) -> Result<Vec<QueuedEntry>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT q.id AS queue_id, q.entry_id, q.reason, q.priority,
               e.path, e.current_author, e.current_title
        FROM queue q
        JOIN entries e ON e.id = q.entry_id
        ORDER BY q.priority, q.added_at, q.id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch queue batch", e))?;

    rows.into_iter().map(row_to_queued).collect()
}

/// Gets one queue item joined with its entry
pub async fn get_queue_item(pool: &DbPool, id: QueueId) -> Result<QueuedEntry, AppError> {
    let row = sqlx::query(
        r#"
        SELECT q.id AS queue_id, q.entry_id, q.reason, q.priority,
               e.path, e.current_author, e.current_title
        FROM queue q
        JOIN entries e ON e.id = q.entry_id
        WHERE q.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch queue item", e))?
    .ok_or_else(|| AppError::RecordNotFound {
        entity: "QueueItem".to_string(),
        identifier: id.to_string(),
    })?;

    row_to_queued(row)
}

/// Deletes one queue item
pub async fn remove_queue_item(pool: &DbPool, id: QueueId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM queue WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to remove queue item", e))?;

    Ok(())
}

/// Deletes whatever item is outstanding for an entry
pub async fn dequeue_entry(pool: &DbPool, entry_id: EntryId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM queue WHERE entry_id = ?")
        .bind(entry_id)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to dequeue entry", e))?;

    Ok(())
}

/// Number of outstanding queue items
pub async fn queue_length(pool: &DbPool) -> Result<i64, AppError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM queue")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to count queue", e))
}

/// Deletes every queue item
pub async fn clear_queue(pool: &DbPool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM queue")
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to clear queue", e))?;

    Ok(result.rows_affected())
}

fn row_to_queued(row: sqlx::sqlite::SqliteRow) -> Result<QueuedEntry, AppError> {
    let path: String = row
        .try_get("path")
        .map_err(|e| AppError::database("Missing entry path", e))?;

    Ok(QueuedEntry {
        queue_id: row
            .try_get("queue_id")
            .map_err(|e| AppError::database("Missing queue ID", e))?,
        entry_id: row
            .try_get("entry_id")
            .map_err(|e| AppError::database("Missing entry ID", e))?,
        path: PathBuf::from(path),
        current_author: row
            .try_get("current_author")
            .map_err(|e| AppError::database("Missing current author", e))?,
        current_title: row
            .try_get("current_title")
            .map_err(|e| AppError::database("Missing current title", e))?,
        priority: row
            .try_get("priority")
            .map_err(|e| AppError::database("Missing priority", e))?,
        reason: row
            .try_get("reason")
            .map_err(|e| AppError::database("Missing reason", e))?,
    })
}
