//! Rename history operations
//!
//! A `fixed` record and the entry update it describes are always written in
//! one transaction, so history never points at a path the entry does not hold.

use crate::queries::entries::path_str;
use crate::DbPool;
use shelfwise_core::{
    AppError, EntryId, EntryStatus, HistoryId, HistoryRecord, HistoryStatus, NewHistoryRecord,
    Timestamp,
};
use sqlx::{Row, Sqlite, Transaction};
use std::path::PathBuf;

const HISTORY_COLUMNS: &str = "id, entry_id, old_author, old_title, old_path, new_author, \
     new_title, new_path, status, error_message, created_at";

/// Outcome of committing an applied rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedRename {
    /// The `fixed` history record
    pub history_id: HistoryId,
    /// Another entry already claimed the destination and was removed
    pub merged_entry: Option<EntryId>,
}

/// Inserts a history record
pub async fn insert_history(
    pool: &DbPool,
    record: &NewHistoryRecord,
) -> Result<HistoryId, AppError> {
    let mut tx = begin(pool).await?;
    let id = insert_in(&mut tx, record).await?;
    commit(tx).await?;
    Ok(id)
}

/// Records a proposed rename awaiting approval
///
/// Replaces any older proposal for the same entry and moves the entry to
/// `pending_fix`.
pub async fn record_pending_fix(
    pool: &DbPool,
    record: &NewHistoryRecord,
) -> Result<HistoryId, AppError> {
    let mut tx = begin(pool).await?;

    sqlx::query("DELETE FROM history WHERE entry_id = ? AND status = 'pending_fix'")
        .bind(record.entry_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to clear stale proposals", e))?;

    let pending = NewHistoryRecord {
        status: HistoryStatus::PendingFix,
        ..record.clone()
    };
    let id = insert_in(&mut tx, &pending).await?;

    sqlx::query("UPDATE entries SET status = ?, error_message = ?, updated_at = ? WHERE id = ?")
        .bind(EntryStatus::PendingFix.as_str())
        .bind(&record.error_message)
        .bind(Timestamp::now().as_millis())
        .bind(record.entry_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to mark entry pending", e))?;

    commit(tx).await?;
    Ok(id)
}

/// Commits a rename that already happened on disk
///
/// With `approved` set, that pending record becomes `fixed`; otherwise a new
/// `fixed` record is inserted. Other pending proposals for the entry are
/// dropped. If a different entry already holds the destination path, that
/// stale row is deleted so the moved entry can take the path; its history
/// is re-pointed at the moved entry.
pub async fn apply_rename(
    pool: &DbPool,
    record: &NewHistoryRecord,
    approved: Option<HistoryId>,
) -> Result<AppliedRename, AppError> {
    let mut tx = begin(pool).await?;
    let new_path = path_str(&record.new_path);

    let history_id = match approved {
        Some(id) => {
            sqlx::query(
                "UPDATE history SET status = 'fixed', error_message = NULL, \
                 new_author = ?, new_title = ?, new_path = ? WHERE id = ?",
            )
            .bind(&record.new_author)
            .bind(&record.new_title)
            .bind(&new_path)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("Failed to mark history fixed", e))?;

            sqlx::query(
                "DELETE FROM history WHERE entry_id = ? AND status = 'pending_fix' AND id != ?",
            )
            .bind(record.entry_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("Failed to clear stale proposals", e))?;
            id
        }
        None => {
            sqlx::query("DELETE FROM history WHERE entry_id = ? AND status = 'pending_fix'")
                .bind(record.entry_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::database("Failed to clear stale proposals", e))?;

            let fixed = NewHistoryRecord {
                status: HistoryStatus::Fixed,
                error_message: None,
                ..record.clone()
            };
            insert_in(&mut tx, &fixed).await?
        }
    };

    let merged_entry: Option<EntryId> =
        sqlx::query_scalar("SELECT id FROM entries WHERE path = ? AND id != ?")
            .bind(&new_path)
            .bind(record.entry_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::database("Failed to check destination entry", e))?;

    if let Some(other) = merged_entry {
        sqlx::query("DELETE FROM history WHERE entry_id = ? AND status = 'pending_fix'")
            .bind(other)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("Failed to drop merged proposals", e))?;

        sqlx::query("UPDATE history SET entry_id = ? WHERE entry_id = ?")
            .bind(record.entry_id)
            .bind(other)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("Failed to carry over merged history", e))?;

        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(other)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("Failed to merge duplicate entry", e))?;
    }

    sqlx::query(
        r#"
        UPDATE entries
        SET path = ?, current_author = ?, current_title = ?, status = 'fixed',
            error_message = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&new_path)
    .bind(&record.new_author)
    .bind(&record.new_title)
    .bind(Timestamp::now().as_millis())
    .bind(record.entry_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::database("Failed to update renamed entry", e))?;

    sqlx::query("DELETE FROM queue WHERE entry_id = ?")
        .bind(record.entry_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to dequeue renamed entry", e))?;

    commit(tx).await?;

    Ok(AppliedRename {
        history_id,
        merged_entry,
    })
}

/// Commits an undo: marks the record `undone` and puts the entry back at
/// its old path as `protected`, in one transaction
pub async fn apply_undo(
    pool: &DbPool,
    record: &HistoryRecord,
    message: &str,
) -> Result<(), AppError> {
    let mut tx = begin(pool).await?;

    sqlx::query("UPDATE history SET status = 'undone', error_message = ? WHERE id = ?")
        .bind(message)
        .bind(record.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to mark history undone", e))?;

    let restored = sqlx::query(
        r#"
        UPDATE entries
        SET path = ?, current_author = ?, current_title = ?, status = 'protected',
            error_message = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(path_str(&record.old_path))
    .bind(&record.old_author)
    .bind(&record.old_title)
    .bind(Timestamp::now().as_millis())
    .bind(record.entry_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::database("Failed to restore entry", e))?;

    if restored.rows_affected() == 0 {
        return Err(AppError::RecordNotFound {
            entity: "entry".to_string(),
            identifier: record.entry_id.to_string(),
        });
    }

    commit(tx).await
}

/// Gets a history record by ID
pub async fn get_history(pool: &DbPool, id: HistoryId) -> Result<HistoryRecord, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM history WHERE id = ?",
        HISTORY_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch history", e))?
    .ok_or_else(|| AppError::RecordNotFound {
        entity: "HistoryRecord".to_string(),
        identifier: id.to_string(),
    })?;

    row_to_history(row)
}

/// Lists history newest first, optionally restricted to one status
pub async fn list_history(
    pool: &DbPool,
    status: Option<HistoryStatus>,
    limit: i64,
) -> Result<Vec<HistoryRecord>, AppError> {
    let rows = match status {
        Some(status) => sqlx::query(&format!(
            "SELECT {} FROM history WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            HISTORY_COLUMNS
        ))
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(pool)
        .await,
        None => sqlx::query(&format!(
            "SELECT {} FROM history ORDER BY created_at DESC, id DESC LIMIT ?",
            HISTORY_COLUMNS
        ))
        .bind(limit)
        .fetch_all(pool)
        .await,
    }
    .map_err(|e| AppError::database("Failed to list history", e))?;

    rows.into_iter().map(row_to_history).collect()
}

/// Sets the status and error message of a history record
pub async fn set_history_status(
    pool: &DbPool,
    id: HistoryId,
    status: HistoryStatus,
    error_message: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE history SET status = ?, error_message = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(error_message)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to update history status", e))?;

    Ok(())
}

/// Deletes one history record
pub async fn delete_history(pool: &DbPool, id: HistoryId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM history WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to delete history", e))?;

    Ok(())
}

/// Deletes all history
pub async fn clear_history(pool: &DbPool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM history")
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to clear history", e))?;

    Ok(result.rows_affected())
}

/// Counts history grouped by status name
pub async fn count_by_status(
    pool: &DbPool,
) -> Result<std::collections::BTreeMap<String, i64>, AppError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM history GROUP BY status")
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::database("Failed to count history by status", e))?;

    Ok(rows.into_iter().collect())
}

async fn begin(pool: &DbPool) -> Result<Transaction<'static, Sqlite>, AppError> {
    pool.begin()
        .await
        .map_err(|e| AppError::database("Failed to start transaction", e))
}

async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::database("Failed to commit transaction", e))
}

async fn insert_in(
    tx: &mut Transaction<'static, Sqlite>,
    record: &NewHistoryRecord,
) -> Result<HistoryId, AppError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO history (
            entry_id, old_author, old_title, old_path,
            new_author, new_title, new_path, status, error_message, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(record.entry_id)
    .bind(&record.old_author)
    .bind(&record.old_title)
    .bind(path_str(&record.old_path))
    .bind(&record.new_author)
    .bind(&record.new_title)
    .bind(path_str(&record.new_path))
    .bind(record.status.as_str())
    .bind(&record.error_message)
    .bind(Timestamp::now().as_millis())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::database("Failed to insert history", e))
}

fn row_to_history(row: sqlx::sqlite::SqliteRow) -> Result<HistoryRecord, AppError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| AppError::database("Missing history status", e))?;
    let status = status
        .parse::<HistoryStatus>()
        .map_err(|e| AppError::database("Invalid history status", std::io::Error::other(e)))?;

    let old_path: String = row
        .try_get("old_path")
        .map_err(|e| AppError::database("Missing old path", e))?;
    let new_path: String = row
        .try_get("new_path")
        .map_err(|e| AppError::database("Missing new path", e))?;

    Ok(HistoryRecord {
        id: row
            .try_get("id")
            .map_err(|e| AppError::database("Missing history ID", e))?,
        entry_id: row
            .try_get("entry_id")
            .map_err(|e| AppError::database("Missing entry ID", e))?,
        old_author: row
            .try_get("old_author")
            .map_err(|e| AppError::database("Missing old author", e))?,
        old_title: row
            .try_get("old_title")
            .map_err(|e| AppError::database("Missing old title", e))?,
        old_path: PathBuf::from(old_path),
        new_author: row
            .try_get("new_author")
            .map_err(|e| AppError::database("Missing new author", e))?,
        new_title: row
            .try_get("new_title")
            .map_err(|e| AppError::database("Missing new title", e))?,
        new_path: PathBuf::from(new_path),
        status,
        error_message: row.try_get("error_message").ok().flatten(),
        created_at: Timestamp::from_millis(
            row.try_get("created_at")
                .map_err(|e| AppError::database("Missing created_at", e))?,
        ),
    })
}
