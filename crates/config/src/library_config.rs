//! Library layout and naming configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tokens accepted by a custom naming template
pub const TEMPLATE_TOKENS: [&str; 8] = [
    "author",
    "title",
    "series",
    "series_num",
    "narrator",
    "year",
    "edition",
    "variant",
];

/// How a book's destination folder is laid out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// `Author/Title`
    AuthorTitle,
    /// `Author - Title` as a single folder
    Flat,
    /// `Author/Series/Title` when the series is known
    SeriesGrouped,
    /// Token substitution of `custom_template`
    Custom,
}

impl std::fmt::Display for NamingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingMode::AuthorTitle => write!(f, "author_title"),
            NamingMode::Flat => write!(f, "flat"),
            NamingMode::SeriesGrouped => write!(f, "series_grouped"),
            NamingMode::Custom => write!(f, "custom"),
        }
    }
}

/// Library roots and naming settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Library roots to scan
    pub library_paths: Vec<PathBuf>,

    /// Destination layout
    pub naming: NamingMode,

    /// Audiobookshelf-style title folders: `N - Title` prefix, narrator in braces
    pub series_grouping: bool,

    /// Template used when `naming` is `custom`, e.g. `{author}/{series}/{title}`
    pub custom_template: String,

    /// Audio file extensions (lowercase, without dot)
    pub audio_extensions: Vec<String>,

    /// Ebook file extensions (lowercase, without dot)
    pub ebook_extensions: Vec<String>,
}

impl LibraryConfig {
    /// Returns true if `ext` (without dot, any case) is an audio extension
    pub fn is_audio_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.audio_extensions.iter().any(|e| *e == ext)
    }

    /// Returns true if `ext` (without dot, any case) is an ebook extension
    pub fn is_ebook_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.ebook_extensions.iter().any(|e| *e == ext)
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_paths: Vec::new(),
            naming: NamingMode::AuthorTitle,
            series_grouping: false,
            custom_template: "{author}/{title}".to_string(),
            audio_extensions: ["mp3", "m4a", "m4b", "flac", "ogg", "opus", "wma", "aac"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ebook_extensions: ["epub", "pdf", "mobi", "azw3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ConfigSection for LibraryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        for (i, ext) in self.audio_extensions.iter().enumerate() {
            results.push(Validator::not_empty(
                ext,
                &format!("library.audio_extensions[{}]", i),
            ));
            if ext.starts_with('.') {
                results.push(Err(ValidationError::with_value(
                    format!("library.audio_extensions[{}]", i),
                    "must not start with a dot",
                    ext,
                )));
            }
        }

        if self.audio_extensions.is_empty() {
            results.push(Err(ValidationError::new(
                "library.audio_extensions",
                "must list at least one extension",
            )));
        }

        for (i, path) in self.library_paths.iter().enumerate() {
            if path.as_os_str().is_empty() {
                results.push(Err(ValidationError::new(
                    format!("library.library_paths[{}]", i),
                    "must not be empty",
                )));
            }
        }

        if self.naming == NamingMode::Custom {
            results.push(Validator::not_empty(
                &self.custom_template,
                "library.custom_template",
            ));
            results.push(Validator::template_tokens(
                &self.custom_template,
                &TEMPLATE_TOKENS,
                "library.custom_template",
            ));
            if !self.custom_template.contains("{title}") {
                results.push(Err(ValidationError::with_value(
                    "library.custom_template",
                    "must contain {title}",
                    &self.custom_template,
                )));
            }
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        if !other.library_paths.is_empty() {
            self.library_paths = other.library_paths;
        }
        self.naming = other.naming;
        self.series_grouping = other.series_grouping;
        self.custom_template = other.custom_template;
        self.audio_extensions = other.audio_extensions;
        self.ebook_extensions = other.ebook_extensions;
    }

    fn section_name(&self) -> &'static str {
        "library"
    }
}
