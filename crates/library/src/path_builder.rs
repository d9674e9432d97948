//! Safe destination paths for renamed books
//!
//! Every free-text component is sanitized before it touches the filesystem
//! and every finished path is checked to lie strictly inside the library
//! root, whatever naming mode produced it.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use shelfwise_config::{LibraryConfig, NamingMode};
use std::path::{Component, Path, PathBuf};

/// Shortest author, title or attribute that survives sanitization
const MIN_COMPONENT_LEN: usize = 2;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static EMPTY_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\)|\[\s*\]|\{\s*\}").expect("valid regex"));
static REPEATED_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s*-\s*){2,}").expect("valid regex"));
static TEMPLATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(author|title|series|series_num|narrator|year|edition|variant)\}")
        .expect("valid regex")
});

/// Everything that can appear in a destination path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookIdentity {
    pub author: String,
    pub title: String,
    pub series: Option<String>,
    pub series_num: Option<String>,
    pub narrator: Option<String>,
    pub year: Option<i32>,
    pub edition: Option<String>,
    pub variant: Option<String>,
}

impl BookIdentity {
    pub fn new(author: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_series(mut self, series: impl Into<String>, num: Option<String>) -> Self {
        self.series = Some(series.into());
        self.series_num = num;
        self
    }

    pub fn with_narrator(mut self, narrator: impl Into<String>) -> Self {
        self.narrator = Some(narrator.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// The same book without any distinguishing attribute
    fn bare(&self) -> Self {
        Self {
            narrator: None,
            year: None,
            edition: None,
            variant: None,
            ..self.clone()
        }
    }
}

/// Cleans one path component
///
/// Returns `None` for traversal attempts, absolute components and anything
/// shorter than `min_len` after cleaning.
fn sanitize_with_min(raw: &str, min_len: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.contains("..") || trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return None;
    }

    let stripped: String = trimmed
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();
    let collapsed = SPACES.replace_all(&stripped, " ");
    let cleaned = collapsed
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    if cleaned.chars().count() < min_len.max(1) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Cleans an author, title or other free-text component
pub fn sanitize_component(raw: &str) -> Option<String> {
    sanitize_with_min(raw, MIN_COMPONENT_LEN)
}

fn sanitize_optional(value: Option<&str>, min_len: usize) -> Option<String> {
    value.and_then(|v| sanitize_with_min(v, min_len))
}

/// Components after sanitization; optional ones that fail are dropped
struct CleanIdentity {
    author: String,
    title: String,
    series: Option<String>,
    series_num: Option<String>,
    narrator: Option<String>,
    year: Option<String>,
    edition: Option<String>,
    variant: Option<String>,
}

impl CleanIdentity {
    fn sanitize(identity: &BookIdentity) -> Option<Self> {
        Some(Self {
            author: sanitize_component(&identity.author)?,
            title: sanitize_component(&identity.title)?,
            series: sanitize_optional(identity.series.as_deref(), MIN_COMPONENT_LEN),
            series_num: sanitize_optional(identity.series_num.as_deref(), 1),
            narrator: sanitize_optional(identity.narrator.as_deref(), MIN_COMPONENT_LEN),
            year: identity.year.filter(|y| *y > 0).map(|y| y.to_string()),
            edition: sanitize_optional(identity.edition.as_deref(), MIN_COMPONENT_LEN),
            variant: sanitize_optional(identity.variant.as_deref(), MIN_COMPONENT_LEN),
        })
    }

    fn title_folder(&self, series_grouping: bool) -> String {
        let mut folder = match (&self.series, &self.series_num) {
            (Some(_), Some(num)) if series_grouping => format!("{} - {}", num, self.title),
            _ => self.title.clone(),
        };

        if let Some(tag) = self.variant.as_ref().or(self.edition.as_ref()) {
            folder.push_str(&format!(" [{}]", tag));
        } else if let Some(year) = &self.year {
            folder.push_str(&format!(" ({})", year));
        }

        if let Some(narrator) = &self.narrator {
            if series_grouping {
                folder.push_str(&format!(" {{{}}}", narrator));
            } else {
                folder.push_str(&format!(" ({})", narrator));
            }
        }

        folder
    }

    fn token(&self, name: &str) -> &str {
        let value = match name {
            "author" => Some(&self.author),
            "title" => Some(&self.title),
            "series" => self.series.as_ref(),
            "series_num" => self.series_num.as_ref(),
            "narrator" => self.narrator.as_ref(),
            "year" => self.year.as_ref(),
            "edition" => self.edition.as_ref(),
            "variant" => self.variant.as_ref(),
            _ => None,
        };
        value.map_or("", String::as_str)
    }
}

/// Builds destination paths under one library root
#[derive(Debug, Clone)]
pub struct PathBuilder {
    root: PathBuf,
    naming: NamingMode,
    series_grouping: bool,
    template: String,
}

impl PathBuilder {
    pub fn new(root: impl Into<PathBuf>, config: &LibraryConfig) -> Self {
        Self {
            root: root.into(),
            naming: config.naming,
            series_grouping: config.series_grouping,
            template: config.custom_template.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination for `identity`, or `None` if any check fails
    pub fn build(&self, identity: &BookIdentity) -> Option<PathBuf> {
        let Some(clean) = CleanIdentity::sanitize(identity) else {
            warn!(
                "Rejected destination for '{} - {}': author or title unsafe after sanitizing",
                identity.author, identity.title
            );
            return None;
        };

        let segments = self.segments(&clean)?;
        let relative: PathBuf = segments.iter().collect();
        ensure_within_root(&self.root, &relative)
    }

    /// Alternative destinations, each distinguished by one attribute
    ///
    /// Tried in order: narrator, variant, edition, year. Attributes the
    /// book does not have are skipped.
    pub fn disambiguated(&self, identity: &BookIdentity) -> Vec<PathBuf> {
        let bare = identity.bare();
        let mut options = Vec::new();

        if let Some(narrator) = &identity.narrator {
            options.push(BookIdentity {
                narrator: Some(narrator.clone()),
                ..bare.clone()
            });
        }
        if let Some(variant) = &identity.variant {
            options.push(BookIdentity {
                variant: Some(variant.clone()),
                ..bare.clone()
            });
        }
        if let Some(edition) = &identity.edition {
            options.push(BookIdentity {
                edition: Some(edition.clone()),
                ..bare.clone()
            });
        }
        if let Some(year) = identity.year {
            options.push(BookIdentity {
                year: Some(year),
                ..bare.clone()
            });
        }

        let base = self.build(identity);
        let mut paths: Vec<PathBuf> = Vec::new();
        for path in options.iter().filter_map(|o| self.build(o)) {
            if Some(&path) != base.as_ref() && !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    fn segments(&self, clean: &CleanIdentity) -> Option<Vec<String>> {
        let title_folder = clean.title_folder(self.series_grouping);

        let segments = match self.naming {
            NamingMode::Flat => vec![format!("{} - {}", clean.author, title_folder)],
            NamingMode::Custom => self.template_segments(clean)?,
            NamingMode::SeriesGrouped | NamingMode::AuthorTitle => {
                let grouped =
                    self.naming == NamingMode::SeriesGrouped || self.series_grouping;
                match &clean.series {
                    Some(series) if grouped => {
                        vec![clean.author.clone(), series.clone(), title_folder]
                    }
                    _ => vec![clean.author.clone(), title_folder],
                }
            }
        };
        Some(segments)
    }

    fn template_segments(&self, clean: &CleanIdentity) -> Option<Vec<String>> {
        let filled = TEMPLATE_TOKEN.replace_all(&self.template, |caps: &regex::Captures| {
            clean.token(&caps[1]).to_string()
        });
        let tidied = EMPTY_BRACKETS.replace_all(&filled, "");
        let tidied = REPEATED_DASH.replace_all(&tidied, " - ");

        let mut segments = Vec::new();
        for raw in tidied.split('/') {
            let raw = raw.trim().trim_matches(|c: char| c == '-' || c.is_whitespace());
            if raw.is_empty() {
                continue;
            }
            match sanitize_component(raw) {
                Some(segment) => segments.push(segment),
                None => {
                    warn!(
                        "Rejected template segment '{}' from '{}'",
                        raw, self.template
                    );
                    return None;
                }
            }
        }
        Some(segments)
    }
}

/// Builds the destination for one book with the configured layout
pub fn build_path(root: &Path, identity: &BookIdentity, config: &LibraryConfig) -> Option<PathBuf> {
    PathBuilder::new(root, config).build(identity)
}

/// Resolves `root` the way the filesystem sees it
fn resolve_root(root: &Path) -> Option<PathBuf> {
    match root.canonicalize() {
        Ok(resolved) => Some(resolved),
        Err(_) => std::path::absolute(root).ok(),
    }
}

/// Joins `relative` below `root` and verifies the result stays inside it
///
/// The relative part must consist of at least one plain component. When
/// some ancestor of the destination already exists, its resolved location
/// must still be inside the resolved root, so symlinked folders cannot lead
/// outside the library.
pub fn ensure_within_root(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut depth = 0;
    for component in relative.components() {
        match component {
            Component::Normal(_) => depth += 1,
            other => {
                warn!(
                    "Rejected destination {}: component {:?} is not allowed",
                    relative.display(),
                    other
                );
                return None;
            }
        }
    }
    if depth == 0 {
        warn!("Rejected destination: nothing below {}", root.display());
        return None;
    }

    let Some(resolved_root) = resolve_root(root) else {
        warn!("Rejected destination: cannot resolve root {}", root.display());
        return None;
    };

    let candidate = resolved_root.join(relative);
    let escapes = match candidate.strip_prefix(&resolved_root) {
        Ok(rest) => rest.components().count() == 0,
        Err(_) => true,
    };

    let existing_escapes = candidate
        .ancestors()
        .take_while(|a| a.starts_with(&resolved_root))
        .find(|a| a.exists())
        .and_then(|a| a.canonicalize().ok())
        .is_some_and(|a| !a.starts_with(&resolved_root));

    if escapes || existing_escapes {
        warn!(
            "Rejected destination {}: not inside library root {}",
            candidate.display(),
            resolved_root.display()
        );
        return None;
    }

    Some(root.join(relative))
}

/// Sanitizes each segment and joins them below `root`
pub fn safe_join(root: &Path, segments: &[&str]) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in segments {
        relative.push(sanitize_component(segment)?);
    }
    ensure_within_root(root, &relative)
}

/// Returns true if `path` is `root` or lies below it
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    match (resolve_root(path), resolve_root(root)) {
        (Some(path), Some(root)) => path.starts_with(root),
        _ => false,
    }
}
