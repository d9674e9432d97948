//! Audio files sitting directly in author folders

use crate::error::{LibraryError, LibraryResult};
use crate::metadata::read_tags;
use crate::path_builder::safe_join;
use crate::structure::{audio_files_in, file_name, subdirs};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use shelfwise_config::LibraryConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Group name used when neither tags nor file names give a title
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

static LEADING_TRACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[\s\-.]+").expect("valid regex"));
static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+\d+$").expect("valid regex"));
static TRAILING_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*-\s*(chapter|part|track|disc)\s*\d*.*$").expect("valid regex")
});
static FORMAT_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\((?:Unabridged|Abridged|MP3|M4B|64k|128k|HQ|Complete|Full|Retail)\)")
        .expect("valid regex")
});
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\[.*?\]").expect("valid regex"));

/// Loose files in one author folder that seem to belong to one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanGroup {
    pub author: String,
    pub author_path: PathBuf,
    pub title: String,
    pub files: Vec<PathBuf>,
}

/// Book title guessed from a track file name
fn title_from_stem(stem: &str) -> Option<String> {
    let title = LEADING_TRACK.replace(stem, "");
    let title = TRAILING_NUMBER.replace(&title, "");
    let title = TRAILING_PART.replace(&title, "");
    let title = title.trim();
    (!title.is_empty() && title != stem).then(|| title.to_string())
}

fn group_title(file: &Path) -> String {
    if let Some(album) = read_tags(file).and_then(|t| t.album) {
        return album;
    }
    file.file_stem()
        .and_then(|s| s.to_str())
        .and_then(title_from_stem)
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string())
}

/// Finds loose audio files in every author folder below `root`
///
/// Files are grouped by album tag, or by their file name with track
/// numbers removed.
pub fn find_orphans(root: &Path, library: &LibraryConfig) -> LibraryResult<Vec<OrphanGroup>> {
    let mut groups = Vec::new();

    for author_dir in subdirs(root)? {
        let Some(author) = file_name(&author_dir) else {
            continue;
        };
        let files = audio_files_in(&author_dir, library)?;
        if files.is_empty() {
            continue;
        }

        let mut by_title: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for file in files {
            by_title.entry(group_title(&file)).or_default().push(file);
        }

        for (title, files) in by_title {
            groups.push(OrphanGroup {
                author: author.to_string(),
                author_path: author_dir.clone(),
                title,
                files,
            });
        }
    }
    Ok(groups)
}

fn folder_title(title: &str) -> String {
    let cleaned = FORMAT_TAGS.replace_all(title, "");
    let cleaned = BRACKETED.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Moves one group of loose files into a new book folder
///
/// Returns the folder the files now live in. Fails when the folder already
/// exists with content, and never overwrites a file.
pub fn organize_orphans(group: &OrphanGroup) -> LibraryResult<PathBuf> {
    if group.title == UNKNOWN_ALBUM {
        return Err(LibraryError::invalid_state(
            "organize files",
            "no book title could be determined",
        ));
    }

    let title = folder_title(&group.title);
    let book_dir = safe_join(&group.author_path, &[&title])
        .ok_or_else(|| LibraryError::UnsafePath(group.title.clone()))?;

    if book_dir.exists() {
        let occupied = fs::read_dir(&book_dir)?.next().is_some();
        if occupied {
            return Err(LibraryError::invalid_state(
                "organize files",
                format!("{} already exists with content", book_dir.display()),
            ));
        }
    } else {
        fs::create_dir_all(&book_dir)?;
    }

    let mut moved = 0;
    for file in &group.files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let destination = book_dir.join(name);
        if !file.exists() || destination.exists() {
            warn!("Skipping {}", file.display());
            continue;
        }
        fs::rename(file, &destination)?;
        moved += 1;
    }

    info!("Organized {} loose files into {}", moved, book_dir.display());
    Ok(book_dir)
}
