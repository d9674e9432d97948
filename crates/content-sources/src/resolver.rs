// FILE: crates/content-sources/src/resolver.rs
//! Candidate resolver: ranked source lookups with garbage filtering

use crate::search_text::{clean_search_title, split_author_title, MIN_QUERY_LEN};
use crate::similarity::is_garbage_match;
use crate::MetadataSource;
use shelfwise_core::Candidate;
use std::sync::Arc;

/// Hints read from files inside a book folder
#[derive(Debug, Clone, Default)]
pub struct SearchHints {
    pub author: Option<String>,
    pub title: Option<String>,
}

/// Tries metadata sources in priority order
///
/// Source failures are logged and treated as "no hit"; they never abort a
/// lookup.
pub struct CandidateResolver {
    sources: Vec<Arc<dyn MetadataSource>>,
}

impl CandidateResolver {
    pub fn new(sources: Vec<Arc<dyn MetadataSource>>) -> Self {
        Self { sources }
    }

    /// Names of the available sources, in priority order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.available().map(|s| s.name()).collect()
    }

    fn available(&self) -> impl Iterator<Item = &Arc<dyn MetadataSource>> {
        self.sources.iter().filter(|s| s.is_available())
    }

    async fn query(
        source: &dyn MetadataSource,
        title: &str,
        author: Option<&str>,
    ) -> Option<Candidate> {
        match source.search(title, author).await {
            Ok(Some(hit)) if hit.is_complete() => {
                if is_garbage_match(title, &hit.title) {
                    None
                } else {
                    Some(hit)
                }
            }
            Ok(_) => None,
            Err(e) => {
                log::debug!("{} lookup failed for '{}': {}", source.name(), title, e);
                None
            }
        }
    }

    /// Returns the first non-garbage hit in priority order
    pub async fn resolve(&self, clean_title: &str, author_hint: Option<&str>) -> Option<Candidate> {
        if clean_title.trim().chars().count() < MIN_QUERY_LEN {
            return None;
        }

        for source in self.available() {
            if let Some(hit) = Self::query(source.as_ref(), clean_title, author_hint).await {
                log::info!(
                    "{} found: {} by {}",
                    source.name(),
                    hit.title,
                    hit.author
                );
                return Some(hit);
            }
        }

        None
    }

    /// Queries every source with and without the author hint
    ///
    /// Returns the union of non-garbage hits, deduplicated on lowercase
    /// author and title.
    pub async fn resolve_all(&self, title: &str, author: Option<&str>) -> Vec<Candidate> {
        let clean_title = clean_search_title(title);
        let mut candidates: Vec<Candidate> = Vec::new();

        if clean_title.chars().count() < MIN_QUERY_LEN {
            return candidates;
        }

        for source in self.available() {
            let with_author = Self::query(source.as_ref(), &clean_title, author).await;
            let first_author = with_author.as_ref().map(|hit| hit.author.to_lowercase());
            if let Some(hit) = with_author {
                push_unique(&mut candidates, hit);
            }

            if author.is_none() {
                continue;
            }

            if let Some(hit) = Self::query(source.as_ref(), &clean_title, None).await {
                if first_author.as_deref() != Some(hit.author.to_lowercase().as_str()) {
                    push_unique(&mut candidates, hit);
                }
            }
        }

        log::info!(
            "Gathered {} candidates for '{}'",
            candidates.len(),
            clean_title
        );
        candidates
    }

    /// Looks up a messy folder name such as `Author - Title [MP3]`
    ///
    /// A tag author is used when the name carries none; a tag title replaces
    /// a cleaned title that is very short or just a chapter label.
    pub async fn lookup(&self, messy_name: &str, hints: &SearchHints) -> Option<Candidate> {
        let (author, title) = split_author_title(messy_name);
        let mut clean_title = clean_search_title(&title);

        if clean_title.chars().count() < MIN_QUERY_LEN {
            return None;
        }

        let author = author.or_else(|| hints.author.clone());

        if let Some(tag_title) = hints.title.as_deref().filter(|t| !t.trim().is_empty()) {
            if clean_title.chars().count() < 5 || clean_title.to_lowercase().starts_with("chapter")
            {
                clean_title = clean_search_title(tag_title);
            }
        }

        self.resolve(&clean_title, author.as_deref()).await
    }
}

fn push_unique(candidates: &mut Vec<Candidate>, hit: Candidate) {
    let key = hit.dedup_key();
    if !candidates.iter().any(|c| c.dedup_key() == key) {
        candidates.push(hit);
    }
}
