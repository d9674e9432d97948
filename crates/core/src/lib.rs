pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, Result};
pub use types::{
    Candidate, DailyStats, EntryId, EntryStatus, HistoryId, HistoryRecord, HistoryStatus,
    LibraryEntry, LibraryStats, NewHistoryRecord, QueueId, QueueItem, QueuedEntry, Timestamp,
    MAX_PRIORITY,
};
