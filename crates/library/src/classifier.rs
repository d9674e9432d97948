//! Path classifier: assigns a role to every folder between a library root
//! and a book's files
//!
//! Roles come from, in order: the name database (when one is configured),
//! lexical rules, and finally the position of a segment relative to the book
//! title and its parent. A lookup that fails never decides a role; the
//! result then carries a `db_lookup_failed` marker instead.

use crate::error::{LibraryError, LibraryResult};
use crate::issues::{detect_issues, Issue};
use crate::patterns::{
    is_disc_folder, looks_like_book_number, looks_like_person_name, looks_like_series,
    resembles_title,
};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use shelfwise_config::{LibraryConfig, SeriesTieBreak};
use shelfwise_content_sources::search_text::split_author_title;
use shelfwise_content_sources::{LookupResult, NameDatabase};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

static SERIES_BOOK_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\s+Book\s+(\d+)\s*[-:]\s*(.+)$").expect("valid regex")
});
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Role of one folder segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Author,
    Series,
    BookTitle,
    DiscChapter,
    BookNumber,
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Author => "author",
            Role::Series => "series",
            Role::BookTitle => "book_title",
            Role::DiscChapter => "disc_chapter",
            Role::BookNumber => "book_number",
            Role::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// How firmly the author role was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Certainty {
    Low,
    Medium,
    High,
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Certainty::High => "high",
            Certainty::Medium => "medium",
            Certainty::Low => "low",
        };
        f.write_str(name)
    }
}

/// Where a role came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evidence {
    Database,
    Pattern,
    Position,
}

/// One folder segment and its role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub name: String,
    pub role: Role,
}

/// Classification of one path below a library root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedPath {
    /// Folder segments, shallowest first
    pub segments: Vec<Segment>,
    pub detected_author: Option<String>,
    pub detected_title: Option<String>,
    pub detected_series: Option<String>,
    pub series_num: Option<String>,
    pub confidence: Certainty,
    #[serde(skip)]
    pub issues: Vec<Issue>,
    pub structure_reversed: bool,
    pub db_lookup_failed: bool,
}

impl ClassifiedPath {
    /// Segments with the given role, shallowest first
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.role == role)
    }

    /// Issue tags as strings
    pub fn issue_tags(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.to_string()).collect()
    }
}

/// What the name database said about one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    NotConfigured,
    Failed,
    Author,
    Series,
    Both,
    Neither,
}

/// Lexical rules, checked in order after the database
const LEXICAL_RULES: [(fn(&str) -> bool, Role); 3] = [
    (looks_like_person_name, Role::Author),
    (looks_like_book_number, Role::BookNumber),
    (looks_like_series, Role::Series),
];

struct Working {
    name: String,
    role: Role,
    evidence: Evidence,
    lookup: Lookup,
}

/// Assigns roles to the folder segments of book paths
#[derive(Clone)]
pub struct PathClassifier {
    names: Option<Arc<dyn NameDatabase>>,
    tie_break: SeriesTieBreak,
    media_extensions: Vec<String>,
}

impl PathClassifier {
    pub fn new(tie_break: SeriesTieBreak, library: &LibraryConfig) -> Self {
        let media_extensions = library
            .audio_extensions
            .iter()
            .chain(library.ebook_extensions.iter())
            .cloned()
            .collect();

        Self {
            names: None,
            tie_break,
            media_extensions,
        }
    }

    /// Consults `names` before the lexical rules
    pub fn with_names(mut self, names: Arc<dyn NameDatabase>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn tie_break(&self) -> SeriesTieBreak {
        self.tie_break
    }

    fn is_media_file_name(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                let e = e.to_ascii_lowercase();
                self.media_extensions.iter().any(|m| *m == e)
            })
    }

    /// Folder segments of `path` below `root`, shallowest first
    fn folder_segments(&self, path: &Path, root: &Path) -> LibraryResult<Vec<String>> {
        let outside = || LibraryError::OutsideLibrary {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        };

        let relative: PathBuf = match path.strip_prefix(root) {
            Ok(rest) => rest.to_path_buf(),
            Err(_) => {
                let resolved_root = root.canonicalize().map_err(|_| outside())?;
                let resolved = path.canonicalize().map_err(|_| outside())?;
                resolved
                    .strip_prefix(&resolved_root)
                    .map_err(|_| outside())?
                    .to_path_buf()
            }
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(outside()),
            }
        }

        let strip_last = segments
            .last()
            .is_some_and(|last| path.is_file() || self.is_media_file_name(last));
        if strip_last {
            segments.pop();
        }

        if segments.is_empty() {
            return Err(outside());
        }
        Ok(segments)
    }

    async fn lookup(&self, name: &str) -> Lookup {
        let Some(names) = &self.names else {
            return Lookup::NotConfigured;
        };

        let author = names.lookup_author(name).await;
        let series = names.lookup_series(name).await;
        match (author, series) {
            (LookupResult::Failed(e), _) | (_, LookupResult::Failed(e)) => {
                debug!("Name lookup for '{}' failed: {}", name, e);
                Lookup::Failed
            }
            (LookupResult::Found, LookupResult::Found) => Lookup::Both,
            (LookupResult::Found, _) => Lookup::Author,
            (_, LookupResult::Found) => Lookup::Series,
            _ => Lookup::Neither,
        }
    }

    /// Classifies `path`, which must lie below `root`
    pub async fn classify(&self, path: &Path, root: &Path) -> LibraryResult<ClassifiedPath> {
        let names = self.folder_segments(path, root)?;

        let mut working: Vec<Working> = names
            .into_iter()
            .map(|name| Working {
                name,
                role: Role::Unknown,
                evidence: Evidence::Position,
                lookup: Lookup::NotConfigured,
            })
            .collect();

        // Deepest first: disc folders, then the book title
        let mut title_index = None;
        for i in (0..working.len()).rev() {
            if is_disc_folder(&working[i].name) {
                working[i].role = Role::DiscChapter;
            } else {
                working[i].role = Role::BookTitle;
                working[i].evidence = Evidence::Pattern;
                title_index = Some(i);
                break;
            }
        }

        let upper = title_index.unwrap_or(0);
        let mut db_lookup_failed = false;
        for segment in working.iter_mut().take(upper) {
            segment.lookup = self.lookup(&segment.name).await;
            db_lookup_failed |= segment.lookup == Lookup::Failed;
            assign_role(segment);
        }

        self.resolve_positions(&mut working, upper);
        Ok(self.finish(working, title_index, db_lookup_failed))
    }

    /// Tie-break and positional fallback for segments above the title
    fn resolve_positions(&self, working: &mut [Working], upper: usize) {
        for i in (0..upper).rev() {
            let parent_is_person = i > 0 && looks_like_person_name(&working[i - 1].name);
            let lookup_unsettled = matches!(
                working[i].lookup,
                Lookup::Both | Lookup::NotConfigured | Lookup::Failed
            );
            let contested = working[i].lookup == Lookup::Both
                || (lookup_unsettled && working[i].role == Role::Author && parent_is_person)
                || (working[i].role == Role::Unknown && parent_is_person);

            if !contested {
                continue;
            }

            let segment = &mut working[i];
            segment.evidence = Evidence::Position;
            segment.role = match self.tie_break {
                SeriesTieBreak::PreferSeriesUnderPerson if parent_is_person => Role::Series,
                SeriesTieBreak::PreferSeriesUnderPerson => Role::Author,
                SeriesTieBreak::PreferAuthor => Role::Author,
                SeriesTieBreak::LeaveUnknown => Role::Unknown,
            };
        }

        let has_author = working[..upper].iter().any(|s| s.role == Role::Author);
        if !has_author && upper > 0 && working[0].role == Role::Unknown {
            working[0].role = Role::Author;
            working[0].evidence = Evidence::Position;
        }
    }

    fn finish(
        &self,
        mut working: Vec<Working>,
        title_index: Option<usize>,
        db_lookup_failed: bool,
    ) -> ClassifiedPath {
        let author_index = working.iter().position(|s| s.role == Role::Author);

        // High needs the person-name pattern; a database hit alone is Medium
        let mut certainty = match author_index.map(|i| (working[i].evidence, &working[i].name)) {
            Some((Evidence::Pattern, _)) => Certainty::High,
            Some((Evidence::Database, name)) if looks_like_person_name(name) => Certainty::High,
            Some((Evidence::Database, _)) | Some((Evidence::Position, _)) => Certainty::Medium,
            None => Certainty::Low,
        };

        let raw_author = author_index.map(|i| working[i].name.clone());
        let raw_title = title_index.map(|i| working[i].name.clone());

        let mut detected_author = raw_author.clone();
        let mut detected_title = raw_title.clone();
        let mut detected_series = working
            .iter()
            .rev()
            .find(|s| s.role == Role::Series)
            .map(|s| s.name.clone());
        let mut series_num = working
            .iter()
            .rev()
            .find(|s| s.role == Role::BookNumber)
            .and_then(|s| DIGITS.find(&s.name).map(|m| m.as_str().to_string()));

        let mut issues = Vec::new();
        let mut structure_reversed = false;

        if let (Some(a), Some(t)) = (author_index, title_index) {
            if resembles_title(&working[a].name) && looks_like_person_name(&working[t].name) {
                debug!(
                    "Reversed structure: '{}' above '{}'",
                    working[a].name, working[t].name
                );
                structure_reversed = true;
                working[a].role = Role::BookTitle;
                working[t].role = Role::Author;
                detected_author = Some(working[t].name.clone());
                detected_title = Some(working[a].name.clone());
                certainty = Certainty::Medium;
            }
        }

        if !structure_reversed {
            if let Some(title) = detected_title.clone() {
                if let Some(caps) = SERIES_BOOK_TITLE.captures(&title) {
                    detected_series = Some(caps[1].trim().to_string());
                    series_num = Some(caps[2].to_string());
                    detected_title = Some(caps[3].trim().to_string());
                } else if detected_author.is_none() {
                    if let (Some(author), rest) = split_author_title(&title) {
                        detected_author = Some(author);
                        detected_title = Some(rest);
                        certainty = Certainty::Medium;
                    }
                }
            }
        }

        if let (Some(author), Some(title)) = (&raw_author, &raw_title) {
            issues.extend(detect_issues(author, title));
        }
        if structure_reversed {
            issues.push(Issue::StructureReversed);
        }
        if db_lookup_failed {
            issues.push(Issue::DbLookupFailed);
        }

        ClassifiedPath {
            segments: working
                .into_iter()
                .map(|w| Segment {
                    name: w.name,
                    role: w.role,
                })
                .collect(),
            detected_author,
            detected_title,
            detected_series,
            series_num,
            confidence: certainty,
            issues,
            structure_reversed,
            db_lookup_failed,
        }
    }
}

/// Database first, then the lexical rules in order
fn assign_role(segment: &mut Working) {
    match segment.lookup {
        Lookup::Author => {
            segment.role = Role::Author;
            segment.evidence = Evidence::Database;
            return;
        }
        Lookup::Series => {
            segment.role = Role::Series;
            segment.evidence = Evidence::Database;
            return;
        }
        Lookup::Both => {
            segment.role = Role::Unknown;
            segment.evidence = Evidence::Position;
            return;
        }
        Lookup::NotConfigured | Lookup::Failed | Lookup::Neither => {}
    }

    if let Some((_, role)) = LEXICAL_RULES.iter().find(|(rule, _)| rule(segment.name.as_str())) {
        segment.role = *role;
        segment.evidence = Evidence::Pattern;
    }
}
