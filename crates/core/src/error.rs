//! Error types for the persistence layer
//!
//! Errors are classified by severity:
//! - **Recoverable**: retrying later is likely to work (locked database)
//! - **Degraded**: the item is skipped, the run continues
//! - **Fatal**: requires user intervention (broken schema)

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Work continues without the failing item
    Degraded,
    /// Critical error requiring user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for Shelfwise storage and file access
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Database Errors =====
    /// Database operation failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database migration failed
    #[error("Migration failed: {version} - {reason}")]
    MigrationFailed { version: String, reason: String },

    /// Record not found in database
    #[error("Record not found: {entity} with {identifier}")]
    RecordNotFound { entity: String, identifier: String },

    // ===== File System Errors =====
    /// File or folder not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Permission denied for file operation
    #[error("Permission denied on {path}")]
    PermissionDenied { path: PathBuf },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DatabaseError { .. } => ErrorSeverity::Recoverable,
            Self::MigrationFailed { .. } | Self::PermissionDenied { .. } => ErrorSeverity::Fatal,
            Self::RecordNotFound { .. } | Self::FileNotFound { .. } | Self::IoError { .. } => {
                ErrorSeverity::Degraded
            }
        }
    }

    /// Returns a message suitable for showing to the person running the tool
    pub fn user_message(&self) -> String {
        match self {
            Self::DatabaseError { .. } => {
                "Database is temporarily unavailable. Please try again.".to_string()
            }
            Self::MigrationFailed { .. } => {
                "Failed to update the library database schema.".to_string()
            }
            Self::RecordNotFound { entity, identifier } => {
                format!("No {} with id {}.", entity, identifier)
            }
            Self::FileNotFound { path } => format!(
                "{} was not found. It may have been moved or deleted.",
                path.display()
            ),
            Self::PermissionDenied { path } => format!(
                "Permission denied on {}. Check the library folder permissions.",
                path.display()
            ),
            Self::IoError { .. } => "A file operation failed. Please try again.".to_string(),
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create an I/O error that keeps the offending path
    pub fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::IoError {
                message: format!("{}: {}", path.display(), source),
                source,
            },
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Degraded);
        assert!(ErrorSeverity::Degraded < ErrorSeverity::Fatal);
    }

    #[test]
    fn test_migration_failure_is_critical() {
        let err = AppError::MigrationFailed {
            version: "001".to_string(),
            reason: "syntax error".to_string(),
        };
        assert!(err.is_critical());
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = AppError::DatabaseError {
            message: "SQLITE_BUSY".to_string(),
            source: None,
        };
        assert!(!err.user_message().contains("SQLITE"));
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);

        let missing = AppError::RecordNotFound {
            entity: "history".to_string(),
            identifier: "42".to_string(),
        };
        assert_eq!(missing.user_message(), "No history with id 42.");
    }

    #[test]
    fn test_database_helper() {
        let inner_err = io::Error::new(io::ErrorKind::Other, "Database locked");
        let err = AppError::database("Query failed", inner_err);
        assert!(matches!(err, AppError::DatabaseError { .. }));
    }

    #[test]
    fn test_io_at_keeps_path() {
        let err = AppError::io_at(
            "/lib/missing",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        match err {
            AppError::FileNotFound { path } => assert_eq!(path, PathBuf::from("/lib/missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "Unknown error");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::IoError { .. }));
    }
}
