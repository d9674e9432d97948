//! Application-level configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Database file path (relative to the data dir if not absolute)
    pub database_path: PathBuf,

    /// Log level for application output
    pub log_level: LogLevel,

    /// Number of recent history rows shown by default
    pub recent_history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("shelfwise.db"),
            log_level: LogLevel::Info,
            recent_history_limit: 20,
        }
    }
}

impl ConfigSection for AppConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if self.database_path.as_os_str().is_empty() {
            results.push(Err(ValidationError::new(
                "app.database_path",
                "must not be empty",
            )));
        }

        results.push(Validator::in_range(
            self.recent_history_limit,
            1,
            1000,
            "app.recent_history_limit",
        ));

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.database_path = other.database_path;
        self.log_level = other.log_level;
        self.recent_history_limit = other.recent_history_limit;
    }

    fn section_name(&self) -> &'static str {
        "app"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_database_path() {
        let mut config = AppConfig::default();
        config.database_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_serializes_lowercase() {
        let text = toml::to_string(&AppConfig::default()).expect("serialize");
        assert!(text.contains("log_level = \"info\""));
    }

    #[test]
    fn test_section_name() {
        assert_eq!(AppConfig::default().section_name(), "app");
    }
}
