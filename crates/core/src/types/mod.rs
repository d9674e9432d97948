//! Domain types for Shelfwise
//!
//! This module contains all domain models organized by responsibility:
//! - `entry`: Library entries and their lifecycle status
//! - `queue`: Queue items and audit history
//! - `candidate`: External metadata hits
//! - `stats`: Library statistics
//! - `common`: Shared utilities

mod candidate;
mod common;
mod entry;
mod queue;
mod stats;

// Re-export all public types
pub use candidate::Candidate;
pub use common::Timestamp;
pub use entry::{EntryId, EntryStatus, LibraryEntry};
pub use queue::{
    HistoryId, HistoryRecord, HistoryStatus, NewHistoryRecord, QueueId, QueueItem, QueuedEntry,
    MAX_PRIORITY,
};
pub use stats::{DailyStats, LibraryStats};
