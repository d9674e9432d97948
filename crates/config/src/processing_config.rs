//! Queue processing and safety configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// How a folder that matches both an author and a series lookup is resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeriesTieBreak {
    /// Treat it as a series when it sits between the title and a person-named parent
    PreferSeriesUnderPerson,
    /// Always treat it as an author
    PreferAuthor,
    /// Leave the role unknown
    LeaveUnknown,
}

impl std::fmt::Display for SeriesTieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesTieBreak::PreferSeriesUnderPerson => write!(f, "prefer_series_under_person"),
            SeriesTieBreak::PreferAuthor => write!(f, "prefer_author"),
            SeriesTieBreak::LeaveUnknown => write!(f, "leave_unknown"),
        }
    }
}

/// Batch processing, rename safety and worker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Apply non-drastic renames without approval
    pub auto_fix: bool,

    /// Run verification on drastic author changes
    pub protect_author_changes: bool,

    /// Queue items sent to the parser per call
    pub batch_size: usize,

    /// Parser calls allowed per rolling hour
    pub max_requests_per_hour: usize,

    /// Hours between worker scan cycles
    pub scan_interval_hours: u64,

    /// Start the background worker with the application
    pub worker_enabled: bool,

    /// Author/series ambiguity policy for the path classifier
    pub series_tie_break: SeriesTieBreak,
}

impl ProcessingConfig {
    /// Delay between batches that spreads the hourly budget evenly
    pub fn inter_batch_delay(&self) -> std::time::Duration {
        let per_hour = self.max_requests_per_hour.max(1) as u64;
        std::time::Duration::from_secs((3600 / per_hour).max(2))
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            auto_fix: false,
            protect_author_changes: true,
            batch_size: 3,
            max_requests_per_hour: 30,
            scan_interval_hours: 6,
            worker_enabled: true,
            series_tie_break: SeriesTieBreak::PreferSeriesUnderPerson,
        }
    }
}

impl ConfigSection for ProcessingConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let results = vec![
            Validator::in_range(self.batch_size, 1, 50, "processing.batch_size"),
            Validator::in_range(
                self.max_requests_per_hour,
                1,
                3600,
                "processing.max_requests_per_hour",
            ),
            Validator::in_range(
                self.scan_interval_hours,
                1,
                24 * 7,
                "processing.scan_interval_hours",
            ),
        ];

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.auto_fix = other.auto_fix;
        self.protect_author_changes = other.protect_author_changes;
        self.batch_size = other.batch_size;
        self.max_requests_per_hour = other.max_requests_per_hour;
        self.scan_interval_hours = other.scan_interval_hours;
        self.worker_enabled = other.worker_enabled;
        self.series_tie_break = other.series_tie_break;
    }

    fn section_name(&self) -> &'static str {
        "processing"
    }
}
