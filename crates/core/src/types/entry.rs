//! Library entries: one physical book folder and its lifecycle status

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Database identifier of a library entry
pub type EntryId = i64;

/// Lifecycle status of a library entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Found by a scan, not yet processed
    Pending,
    /// Author and title levels appear swapped
    StructureReversed,
    /// Folder holds several numbered book folders
    SeriesFolder,
    /// Folder holds several audio files for different books
    MultiBookFiles,
    /// Folder name announces a boxed set
    NeedsSplit,
    /// Audio files with no title folder
    LooseFile,
    /// A proposed rename awaits approval
    PendingFix,
    /// Renamed successfully
    Fixed,
    /// Checked and left as is
    Verified,
    /// Destination occupied by another book
    Conflict,
    /// Processing or renaming failed
    Error,
    /// Undone by the user, exempt from rescans
    Protected,
}

impl EntryStatus {
    /// All statuses, in display order
    pub const ALL: [EntryStatus; 12] = [
        Self::Pending,
        Self::StructureReversed,
        Self::SeriesFolder,
        Self::MultiBookFiles,
        Self::NeedsSplit,
        Self::LooseFile,
        Self::PendingFix,
        Self::Fixed,
        Self::Verified,
        Self::Conflict,
        Self::Error,
        Self::Protected,
    ];

    /// Returns the persisted name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::StructureReversed => "structure_reversed",
            Self::SeriesFolder => "series_folder",
            Self::MultiBookFiles => "multi_book_files",
            Self::NeedsSplit => "needs_split",
            Self::LooseFile => "loose_file",
            Self::PendingFix => "pending_fix",
            Self::Fixed => "fixed",
            Self::Verified => "verified",
            Self::Conflict => "conflict",
            Self::Error => "error",
            Self::Protected => "protected",
        }
    }

    /// Structural statuses are reported but never enter the rename queue
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::StructureReversed
                | Self::SeriesFolder
                | Self::MultiBookFiles
                | Self::NeedsSplit
                | Self::LooseFile
        )
    }

    /// Returns true if a regular scan should leave the entry alone
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Verified | Self::Fixed | Self::Protected)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown entry status '{}'", s))
    }
}

/// One physical book folder tracked by the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: EntryId,
    pub path: PathBuf,
    pub current_author: String,
    pub current_title: String,
    pub status: EntryStatus,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LibraryEntry {
    /// Returns the "author - title" string used in prompts and logs
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.current_author, self.current_title)
    }
}
