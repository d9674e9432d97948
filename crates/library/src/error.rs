// FILE: crates/library/src/error.rs

use shelfwise_core::error::AppError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] AppError),

    #[error("Path {path} is not inside library root {root}")]
    OutsideLibrary { path: PathBuf, root: PathBuf },

    #[error("History record not found: {0}")]
    HistoryNotFound(i64),

    #[error("Queue item not found: {0}")]
    QueueItemNotFound(i64),

    #[error("Cannot {action}: {reason}")]
    InvalidState { action: String, reason: String },

    #[error("Unsafe destination for '{0}'")]
    UnsafePath(String),

    #[error("Language model unavailable: {0}")]
    Llm(#[from] shelfwise_llm::LlmError),

    #[error("Metadata source error: {0}")]
    Source(#[from] shelfwise_content_sources::SourceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LibraryError {
    pub(crate) fn invalid_state(action: &str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            reason: reason.into(),
        }
    }
}

pub type LibraryResult<T> = std::result::Result<T, LibraryError>;
