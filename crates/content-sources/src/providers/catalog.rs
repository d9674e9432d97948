// FILE: crates/content-sources/src/providers/catalog.rs
//! Fuzzy lookups against the private catalog in the local database

use crate::{MetadataSource, SourceResult};
use async_trait::async_trait;
use shelfwise_core::Candidate;
use shelfwise_database::queries::names::{catalog_candidates, normalize_name};
use shelfwise_database::DbPool;

/// Rows fetched per prefilter term before ranking
const PREFILTER_LIMIT: i64 = 50;

/// Longest words of the query used as prefilter terms
const PREFILTER_TERMS: usize = 3;

/// Minimum combined score for a catalog row to count as a hit
pub const CATALOG_MIN_SCORE: f64 = 0.85;

/// Share of the score that still depends on the title when an author is given
const TITLE_WEIGHT: f64 = 0.7;

pub struct LocalCatalogSource {
    pool: DbPool,
}

impl LocalCatalogSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Longest normalized words of the title, longest first
fn prefilter_terms(title: &str) -> Vec<String> {
    let normalized = normalize_name(title);
    let mut words: Vec<&str> = normalized.split(' ').filter(|w| w.len() >= 3).collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()));
    words.dedup();
    words
        .into_iter()
        .take(PREFILTER_TERMS)
        .map(str::to_string)
        .collect()
}

fn score(title: &str, author: Option<&str>, row: &Candidate) -> f64 {
    let title_score =
        strsim::normalized_levenshtein(&normalize_name(title), &normalize_name(&row.title));

    match author {
        Some(author) => {
            let author_score =
                strsim::jaro_winkler(&normalize_name(author), &normalize_name(&row.author));
            title_score * (TITLE_WEIGHT + (1.0 - TITLE_WEIGHT) * author_score)
        }
        None => title_score,
    }
}

#[async_trait]
impl MetadataSource for LocalCatalogSource {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        let mut rows: Vec<Candidate> = Vec::new();
        for term in prefilter_terms(title) {
            for row in catalog_candidates(&self.pool, &term, PREFILTER_LIMIT).await? {
                if !rows.iter().any(|r| r.dedup_key() == row.dedup_key()) {
                    rows.push(row);
                }
            }
        }

        let best = rows
            .into_iter()
            .map(|row| (score(title, author, &row), row))
            .filter(|(score, _)| *score >= CATALOG_MIN_SCORE)
            .max_by(|a, b| a.0.total_cmp(&b.0));

        Ok(best.map(|(score, row)| {
            log::debug!("Catalog hit for '{}': {} ({:.2})", title, row.title, score);
            row.with_confidence(score)
        }))
    }
}
