//! Queue items and audit history

use crate::types::{EntryId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Database identifier of a queue item
pub type QueueId = i64;

/// Database identifier of a history record
pub type HistoryId = i64;

/// Highest priority value a queue item can carry
pub const MAX_PRIORITY: i64 = 10;

/// A pending unit of work for one library entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueId,
    pub entry_id: EntryId,
    pub priority: i64,
    pub reason: String,
    pub added_at: Timestamp,
}

/// A queue item joined with the entry it refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEntry {
    pub queue_id: QueueId,
    pub entry_id: EntryId,
    pub path: PathBuf,
    pub current_author: String,
    pub current_title: String,
    pub priority: i64,
    pub reason: String,
}

impl QueuedEntry {
    /// Returns the "author - title" string sent to the parser
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.current_author, self.current_title)
    }
}

/// Status of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    PendingFix,
    Fixed,
    Error,
    Undone,
}

impl HistoryStatus {
    /// Returns the persisted name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingFix => "pending_fix",
            Self::Fixed => "fixed",
            Self::Error => "error",
            Self::Undone => "undone",
        }
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_fix" => Ok(Self::PendingFix),
            "fixed" => Ok(Self::Fixed),
            "error" => Ok(Self::Error),
            "undone" => Ok(Self::Undone),
            other => Err(format!("unknown history status '{}'", other)),
        }
    }
}

/// Audit entry for a proposed or applied rename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub entry_id: EntryId,
    pub old_author: String,
    pub old_title: String,
    pub old_path: PathBuf,
    pub new_author: String,
    pub new_title: String,
    pub new_path: PathBuf,
    pub status: HistoryStatus,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

/// Values needed to insert a history record
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub entry_id: EntryId,
    pub old_author: String,
    pub old_title: String,
    pub old_path: PathBuf,
    pub new_author: String,
    pub new_title: String,
    pub new_path: PathBuf,
    pub status: HistoryStatus,
    pub error_message: Option<String>,
}
