//! Metadata clues read from files inside a book folder
//!
//! Release `.nfo` files, sidecar JSON, description text and the tags of the
//! first audio file often name the book better than the folder does. They
//! are passed to the parser as hints, never applied directly.

use crate::metadata::read_tags;
use crate::structure::audio_files_in;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use shelfwise_config::LibraryConfig;
use std::fs;
use std::path::Path;

const METADATA_FILES: &[&str] = &["metadata.json", "info.json", "audiobook.json"];
const DESCRIPTION_FILES: &[&str] = &["desc.txt", "description.txt", "readme.txt"];

/// Longest description excerpt kept, in characters
const MAX_DESCRIPTION: usize = 2000;

/// Shortest excerpt shown in prompts
const PROMPT_DESCRIPTION: usize = 200;

static NFO_AUTHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:author|written by|by)\s*[:\s]\s*([^\r\n]+)").expect("valid regex")
});
static NFO_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:title|book)\s*[:\s]\s*([^\r\n]+)").expect("valid regex"));

#[derive(Debug, Default, Deserialize)]
struct SidecarJson {
    #[serde(default, deserialize_with = "loose_string")]
    author: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    narrator: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    series: Option<String>,
}

/// Accepts a string or a list of strings (first element wins)
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => items
            .into_iter()
            .find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty()))
}

/// Clues gathered from one folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderHints {
    pub nfo_author: Option<String>,
    pub nfo_title: Option<String>,
    pub meta_author: Option<String>,
    pub meta_title: Option<String>,
    pub meta_narrator: Option<String>,
    pub meta_series: Option<String>,
    pub audio_author: Option<String>,
    pub audio_title: Option<String>,
    pub audio_narrator: Option<String>,
    pub audio_year: Option<i32>,
    pub description: Option<String>,
}

impl FolderHints {
    pub fn is_empty(&self) -> bool {
        *self == FolderHints::default()
    }

    /// Best author clue: sidecar, then tags, then nfo
    pub fn author(&self) -> Option<&str> {
        self.meta_author
            .as_deref()
            .or(self.audio_author.as_deref())
            .or(self.nfo_author.as_deref())
    }

    /// Best title clue: sidecar, then tags, then nfo
    pub fn title(&self) -> Option<&str> {
        self.meta_title
            .as_deref()
            .or(self.audio_title.as_deref())
            .or(self.nfo_title.as_deref())
    }

    /// One line per clue, for the parse prompt
    pub fn format_for_prompt(&self) -> Option<String> {
        let mut lines = Vec::new();
        let mut push = |label: &str, value: Option<&str>| {
            if let Some(value) = value {
                lines.push(format!("{}: {}", label, value));
            }
        };

        push("Sidecar author", self.meta_author.as_deref());
        push("Sidecar title", self.meta_title.as_deref());
        push("Sidecar narrator", self.meta_narrator.as_deref());
        push("Sidecar series", self.meta_series.as_deref());
        push("Tag author", self.audio_author.as_deref());
        push("Tag album", self.audio_title.as_deref());
        push("Tag narrator", self.audio_narrator.as_deref());
        push("NFO author", self.nfo_author.as_deref());
        push("NFO title", self.nfo_title.as_deref());

        let year = self.audio_year.map(|y| y.to_string());
        push("Tag year", year.as_deref());

        let excerpt = self.description.as_ref().map(|d| {
            let short: String = d.chars().take(PROMPT_DESCRIPTION).collect();
            short.split_whitespace().collect::<Vec<_>>().join(" ")
        });
        push("Description", excerpt.as_deref());

        (!lines.is_empty()).then(|| lines.join("; "))
    }
}

fn read_lossy(path: &Path) -> Option<String> {
    fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_nfo(folder: &Path, hints: &mut FolderHints) {
    let Ok(entries) = fs::read_dir(folder) else {
        return;
    };
    let mut nfos: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("nfo"))
        })
        .collect();
    nfos.sort();

    for nfo in nfos {
        if let Some(content) = read_lossy(&nfo) {
            hints.nfo_author = hints.nfo_author.take().or_else(|| capture(&NFO_AUTHOR, &content));
            hints.nfo_title = hints.nfo_title.take().or_else(|| capture(&NFO_TITLE, &content));
        }
    }
}

fn read_sidecar(folder: &Path, hints: &mut FolderHints) {
    for name in METADATA_FILES {
        let Some(content) = read_lossy(&folder.join(name)) else {
            continue;
        };
        match serde_json::from_str::<SidecarJson>(&content) {
            Ok(meta) => {
                hints.meta_author = hints.meta_author.take().or(meta.author);
                hints.meta_title = hints.meta_title.take().or(meta.title);
                hints.meta_narrator = hints.meta_narrator.take().or(meta.narrator);
                hints.meta_series = hints.meta_series.take().or(meta.series);
            }
            Err(e) => log::debug!("Ignoring unreadable {}: {}", folder.join(name).display(), e),
        }
    }
}

fn read_description(folder: &Path, hints: &mut FolderHints) {
    for name in DESCRIPTION_FILES {
        if let Some(content) = read_lossy(&folder.join(name)) {
            let excerpt: String = content.chars().take(MAX_DESCRIPTION).collect();
            if !excerpt.trim().is_empty() {
                hints.description = Some(excerpt);
                return;
            }
        }
    }
}

fn read_audio_tags(folder: &Path, library: &LibraryConfig, hints: &mut FolderHints) {
    let Ok(files) = audio_files_in(folder, library) else {
        return;
    };
    let Some(tags) = files.first().and_then(|f| read_tags(f)) else {
        return;
    };

    hints.audio_author = tags.author().map(str::to_string);
    hints.audio_title = tags.album.clone();
    hints.audio_narrator = tags.composer.clone();
    hints.audio_year = tags.year;
}

/// Collects every clue found directly inside `folder`
pub fn gather_folder_hints(folder: &Path, library: &LibraryConfig) -> FolderHints {
    let mut hints = FolderHints::default();
    if !folder.is_dir() {
        return hints;
    }

    read_nfo(folder, &mut hints);
    read_sidecar(folder, &mut hints);
    read_description(folder, &mut hints);
    read_audio_tags(folder, library, &mut hints);
    hints
}
