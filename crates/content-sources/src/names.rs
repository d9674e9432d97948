// FILE: crates/content-sources/src/names.rs
//! Name database backed by the local SQLite store

use crate::{LookupResult, NameDatabase};
use async_trait::async_trait;
use shelfwise_core::AppError;
use shelfwise_database::queries::names;
use shelfwise_database::DbPool;

pub struct SqliteNameDatabase {
    pool: DbPool,
}

impl SqliteNameDatabase {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_lookup(kind: &str, name: &str, result: Result<bool, AppError>) -> LookupResult {
    match result {
        Ok(true) => LookupResult::Found,
        Ok(false) => LookupResult::NotFound,
        Err(e) => {
            log::warn!("{} lookup failed for '{}': {}", kind, name, e);
            LookupResult::Failed(e.to_string())
        }
    }
}

#[async_trait]
impl NameDatabase for SqliteNameDatabase {
    async fn lookup_author(&self, name: &str) -> LookupResult {
        to_lookup("Author", name, names::author_exists(&self.pool, name).await)
    }

    async fn lookup_series(&self, name: &str) -> LookupResult {
        to_lookup("Series", name, names::series_exists(&self.pool, name).await)
    }
}
