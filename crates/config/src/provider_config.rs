//! External collaborator configuration: metadata sources and the language model

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Settings shared by every metadata source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    /// Whether the source is queried at all
    pub enabled: bool,

    /// Minimum delay between two calls to the source, in milliseconds
    pub min_delay_ms: u64,
}

impl SourceSettings {
    fn with_delay(min_delay_ms: u64) -> Self {
        Self {
            enabled: true,
            min_delay_ms,
        }
    }

    /// Minimum delay as a `Duration`
    pub fn min_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.min_delay_ms)
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self::with_delay(1500)
    }
}

/// Metadata source settings, in lookup priority order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Consult the local fuzzy catalog before remote sources
    pub local_catalog: bool,

    pub audnexus: SourceSettings,
    pub openlibrary: SourceSettings,
    pub googlebooks: SourceSettings,
    pub hardcover: SourceSettings,

    /// Optional Google Books API key
    pub google_books_api_key: Option<String>,

    /// Hardcover API token; the source is skipped without one
    pub hardcover_token: Option<String>,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            local_catalog: true,
            audnexus: SourceSettings::with_delay(1500),
            openlibrary: SourceSettings::with_delay(1500),
            googlebooks: SourceSettings::with_delay(2500),
            hardcover: SourceSettings::with_delay(2500),
            google_books_api_key: None,
            hardcover_token: None,
            request_timeout_secs: 10,
        }
    }
}

impl ConfigSection for ProvidersConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::in_range(
            self.request_timeout_secs,
            1,
            120,
            "providers.request_timeout_secs",
        )];

        for (name, settings) in [
            ("audnexus", &self.audnexus),
            ("openlibrary", &self.openlibrary),
            ("googlebooks", &self.googlebooks),
            ("hardcover", &self.hardcover),
        ] {
            results.push(Validator::in_range(
                settings.min_delay_ms,
                100,
                60_000,
                &format!("providers.{}.min_delay_ms", name),
            ));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.local_catalog = other.local_catalog;
        self.audnexus = other.audnexus;
        self.openlibrary = other.openlibrary;
        self.googlebooks = other.googlebooks;
        self.hardcover = other.hardcover;
        if other.google_books_api_key.is_some() {
            self.google_books_api_key = other.google_books_api_key;
        }
        if other.hardcover_token.is_some() {
            self.hardcover_token = other.hardcover_token;
        }
        self.request_timeout_secs = other.request_timeout_secs;
    }

    fn section_name(&self) -> &'static str {
        "providers"
    }
}

/// Which language model service parses and verifies names
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenRouter,
    Gemini,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenRouter => write!(f, "openrouter"),
            LlmProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub openrouter_model: String,
    pub gemini_model: String,

    /// Falls back to `OPENROUTER_API_KEY`
    pub openrouter_api_key: Option<String>,

    /// Falls back to `GEMINI_API_KEY`
    pub gemini_api_key: Option<String>,

    /// Retries after a throttled (HTTP 429) call
    pub max_retries: usize,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    /// Returns the configured key for the active provider, or the env fallback
    pub fn api_key(&self) -> Option<String> {
        let (configured, env_name) = match self.provider {
            LlmProvider::OpenRouter => (&self.openrouter_api_key, "OPENROUTER_API_KEY"),
            LlmProvider::Gemini => (&self.gemini_api_key, "GEMINI_API_KEY"),
        };

        configured
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(env_name).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Returns the model name for the active provider
    pub fn model(&self) -> &str {
        match self.provider {
            LlmProvider::OpenRouter => &self.openrouter_model,
            LlmProvider::Gemini => &self.gemini_model,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenRouter,
            openrouter_model: "google/gemma-3n-e4b-it:free".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            openrouter_api_key: None,
            gemini_api_key: None,
            max_retries: 3,
            request_timeout_secs: 90,
        }
    }
}

impl ConfigSection for LlmConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let results = vec![
            Validator::not_empty(self.model(), "llm.model"),
            Validator::in_range(self.max_retries, 0, 10, "llm.max_retries"),
            Validator::in_range(self.request_timeout_secs, 5, 600, "llm.request_timeout_secs"),
        ];

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.provider = other.provider;
        self.openrouter_model = other.openrouter_model;
        self.gemini_model = other.gemini_model;
        if other.openrouter_api_key.is_some() {
            self.openrouter_api_key = other.openrouter_api_key;
        }
        if other.gemini_api_key.is_some() {
            self.gemini_api_key = other.gemini_api_key;
        }
        self.max_retries = other.max_retries;
        self.request_timeout_secs = other.request_timeout_secs;
    }

    fn section_name(&self) -> &'static str {
        "llm"
    }
}
