//! Library statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts over entries, history and the queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_entries: i64,
    pub queue_length: i64,
    /// Entry counts keyed by status name
    pub entries_by_status: BTreeMap<String, i64>,
    /// History counts keyed by status name
    pub history_by_status: BTreeMap<String, i64>,
    pub today: DailyStats,
}

impl LibraryStats {
    /// Returns the number of entries in the given status
    pub fn entries_with(&self, status: &str) -> i64 {
        self.entries_by_status.get(status).copied().unwrap_or(0)
    }

    /// Returns the number of history records in the given status
    pub fn history_with(&self, status: &str) -> i64 {
        self.history_by_status.get(status).copied().unwrap_or(0)
    }
}

/// Per-day activity counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: String,
    pub scanned: i64,
    pub queued: i64,
    pub fixed: i64,
    pub verified: i64,
    pub api_calls: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_status_counts_as_zero() {
        let stats = LibraryStats::default();
        assert_eq!(stats.entries_with("fixed"), 0);
        assert_eq!(stats.history_with("undone"), 0);
    }

    #[test]
    fn test_entries_with() {
        let mut stats = LibraryStats::default();
        stats.entries_by_status.insert("pending".to_string(), 4);
        assert_eq!(stats.entries_with("pending"), 4);
    }
}
