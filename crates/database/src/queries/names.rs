//! Local name database: known authors, known series and a private catalog
//!
//! Names are matched on a normalized key (lowercase alphanumerics separated
//! by single spaces), so "J.R.R. Tolkien" and "j r r tolkien" are one author.

use crate::DbPool;
use shelfwise_core::{AppError, Candidate};
use sqlx::Row;

/// Normalizes a name for lookups
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the author is known
pub async fn author_exists(pool: &DbPool, name: &str) -> Result<bool, AppError> {
    exists(pool, "authors", name).await
}

/// Returns true if the series is known
pub async fn series_exists(pool: &DbPool, name: &str) -> Result<bool, AppError> {
    exists(pool, "series", name).await
}

async fn exists(pool: &DbPool, table: &str, name: &str) -> Result<bool, AppError> {
    let key = normalize_name(name);
    if key.is_empty() {
        return Ok(false);
    }

    let found: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT 1 FROM {} WHERE normalized_name = ? LIMIT 1",
        table
    ))
    .bind(key)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database(format!("Failed to look up {}", table), e))?;

    Ok(found.is_some())
}

/// Adds an author, ignoring duplicates
pub async fn add_author(pool: &DbPool, name: &str) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO authors (name, normalized_name) VALUES (?, ?)")
        .bind(name.trim())
        .bind(normalize_name(name))
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to add author", e))?;

    Ok(())
}

/// Adds a series, ignoring duplicates
pub async fn add_series(pool: &DbPool, name: &str, author: Option<&str>) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO series (name, normalized_name, author) VALUES (?, ?, ?)")
        .bind(name.trim())
        .bind(normalize_name(name))
        .bind(author)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to add series", e))?;

    Ok(())
}

/// Adds a book to the private catalog, registering its author and series
pub async fn add_catalog_book(pool: &DbPool, book: &Candidate) -> Result<(), AppError> {
    let key = format!(
        "{}|{}",
        normalize_name(&book.author),
        normalize_name(&book.title)
    );

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO catalog_books
            (title, author, normalized_key, series, series_num, narrator, year)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(key)
    .bind(&book.series)
    .bind(&book.series_num)
    .bind(&book.narrator)
    .bind(book.year)
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to add catalog book", e))?;

    add_author(pool, &book.author).await?;
    if let Some(series) = &book.series {
        add_series(pool, series, Some(&book.author)).await?;
    }

    Ok(())
}

/// Returns catalog books whose normalized title or author contains `term`
///
/// This is a coarse prefilter; callers rank the rows themselves.
pub async fn catalog_candidates(
    pool: &DbPool,
    term: &str,
    limit: i64,
) -> Result<Vec<Candidate>, AppError> {
    let term = normalize_name(term);
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT title, author, series, series_num, narrator, year
        FROM catalog_books
        WHERE normalized_key LIKE '%' || ? || '%'
        ORDER BY title
        LIMIT ?
        "#,
    )
    .bind(term)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to search catalog", e))?;

    rows.into_iter()
        .map(|row| {
            let title: String = row
                .try_get("title")
                .map_err(|e| AppError::database("Missing catalog title", e))?;
            let author: String = row
                .try_get("author")
                .map_err(|e| AppError::database("Missing catalog author", e))?;

            let mut candidate = Candidate::new(author, title, "catalog");
            candidate.series = row.try_get("series").ok().flatten();
            candidate.series_num = row.try_get("series_num").ok().flatten();
            candidate.narrator = row.try_get("narrator").ok().flatten();
            candidate.year = row.try_get("year").ok().flatten();
            Ok(candidate)
        })
        .collect()
}
