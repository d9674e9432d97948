//! Shelfwise Configuration System
//!
//! Typed, validated configuration stored as TOML. Each section implements
//! the `ConfigSection` trait and is validated independently; all errors are
//! collected and reported together.
//!
//! # Architecture
//!
//! - **Trait-based**: Each section implements `ConfigSection`
//! - **Graceful degradation**: Invalid files on load fall back with warnings
//! - **Atomic writes**: Config files are never left in a corrupted state
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfwise_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Batch size: {}", config.processing.batch_size);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
mod library_config;
mod processing_config;
mod provider_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, Validator};

// Re-export config sections
pub use app_config::{AppConfig, LogLevel};
pub use library_config::{LibraryConfig, NamingMode, TEMPLATE_TOKENS};
pub use processing_config::{ProcessingConfig, SeriesTieBreak};
pub use provider_config::{LlmConfig, LlmProvider, ProvidersConfig, SourceSettings};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Library roots and naming
    pub library: LibraryConfig,

    /// Queue processing and safety switches
    pub processing: ProcessingConfig,

    /// Metadata sources
    pub providers: ProvidersConfig,

    /// Language model
    pub llm: LlmConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.library.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.processing.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.providers.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.llm.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.library.merge(other.library);
        self.processing.merge(other.processing);
        self.providers.merge(other.providers);
        self.llm.merge(other.llm);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            library: LibraryConfig::default(),
            processing: ProcessingConfig::default(),
            providers: ProvidersConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}
