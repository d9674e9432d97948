//! Library entry operations

use crate::DbPool;
use shelfwise_core::{AppError, EntryId, EntryStatus, LibraryEntry, Timestamp};
use sqlx::Row;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const ENTRY_COLUMNS: &str =
    "id, path, current_author, current_title, status, error_message, created_at, updated_at";

/// Inserts an entry for `path`, or refreshes the author/title of the existing one
///
/// The status of an existing entry is left untouched.
pub async fn upsert_entry(
    pool: &DbPool,
    path: &Path,
    author: &str,
    title: &str,
) -> Result<EntryId, AppError> {
    let now = Timestamp::now().as_millis();

    sqlx::query_scalar(
        r#"
        INSERT INTO entries (path, current_author, current_title, status, created_at, updated_at)
        VALUES (?, ?, ?, 'pending', ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            current_author = excluded.current_author,
            current_title = excluded.current_title
        RETURNING id
        "#,
    )
    .bind(path_str(path))
    .bind(author)
    .bind(title)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::database("Failed to upsert entry", e))
}

/// Gets an entry by ID
pub async fn get_entry(pool: &DbPool, id: EntryId) -> Result<LibraryEntry, AppError> {
    let row = sqlx::query(&format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::database("Failed to fetch entry", e))?
        .ok_or_else(|| AppError::RecordNotFound {
            entity: "LibraryEntry".to_string(),
            identifier: id.to_string(),
        })?;

    row_to_entry(row)
}

/// Gets an entry by its absolute path
pub async fn find_entry_by_path(
    pool: &DbPool,
    path: &Path,
) -> Result<Option<LibraryEntry>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM entries WHERE path = ?",
        ENTRY_COLUMNS
    ))
    .bind(path_str(path))
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch entry by path", e))?;

    row.map(row_to_entry).transpose()
}

/// Lists entries, optionally restricted to one status
pub async fn list_entries(
    pool: &DbPool,
    status: Option<EntryStatus>,
) -> Result<Vec<LibraryEntry>, AppError> {
    let rows = match status {
        Some(status) => sqlx::query(&format!(
            "SELECT {} FROM entries WHERE status = ? ORDER BY path",
            ENTRY_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(pool)
        .await,
        None => sqlx::query(&format!("SELECT {} FROM entries ORDER BY path", ENTRY_COLUMNS))
            .fetch_all(pool)
            .await,
    }
    .map_err(|e| AppError::database("Failed to list entries", e))?;

    rows.into_iter().map(row_to_entry).collect()
}

/// Sets the status of an entry, replacing its error message
pub async fn set_status(
    pool: &DbPool,
    id: EntryId,
    status: EntryStatus,
    error_message: Option<&str>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE entries SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(error_message)
    .bind(Timestamp::now().as_millis())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to update entry status", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::RecordNotFound {
            entity: "LibraryEntry".to_string(),
            identifier: id.to_string(),
        });
    }

    Ok(())
}

/// Resets every entry except protected ones to `pending`
///
/// Returns the number of protected entries that were kept.
pub async fn reset_unprotected(pool: &DbPool) -> Result<i64, AppError> {
    sqlx::query(
        "UPDATE entries SET status = 'pending', error_message = NULL, updated_at = ? \
         WHERE status != 'protected'",
    )
    .bind(Timestamp::now().as_millis())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to reset entries", e))?;

    sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE status = 'protected'")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to count protected entries", e))
}

/// Deletes an entry and its queue item; history rows are kept
pub async fn delete_entry(pool: &DbPool, id: EntryId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to delete entry", e))?;

    Ok(())
}

/// Counts all entries
pub async fn count_entries(pool: &DbPool) -> Result<i64, AppError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM entries")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to count entries", e))
}

/// Counts entries grouped by status name
pub async fn count_by_status(pool: &DbPool) -> Result<BTreeMap<String, i64>, AppError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM entries GROUP BY status")
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::database("Failed to count entries by status", e))?;

    Ok(rows.into_iter().collect())
}

pub(crate) fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Converts a database row to a LibraryEntry
pub(crate) fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<LibraryEntry, AppError> {
    let status_str: String = row
        .try_get("status")
        .map_err(|e| AppError::database("Missing entry status", e))?;
    let status = status_str
        .parse::<EntryStatus>()
        .map_err(|e| AppError::database("Invalid entry status", std::io::Error::other(e)))?;

    let path: String = row
        .try_get("path")
        .map_err(|e| AppError::database("Missing entry path", e))?;

    Ok(LibraryEntry {
        id: row
            .try_get("id")
            .map_err(|e| AppError::database("Missing entry ID", e))?,
        path: PathBuf::from(path),
        current_author: row
            .try_get("current_author")
            .map_err(|e| AppError::database("Missing current author", e))?,
        current_title: row
            .try_get("current_title")
            .map_err(|e| AppError::database("Missing current title", e))?,
        status,
        error_message: row.try_get("error_message").ok().flatten(),
        created_at: Timestamp::from_millis(
            row.try_get("created_at")
                .map_err(|e| AppError::database("Missing created_at", e))?,
        ),
        updated_at: Timestamp::from_millis(
            row.try_get("updated_at")
                .map_err(|e| AppError::database("Missing updated_at", e))?,
        ),
    })
}
