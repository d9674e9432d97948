// FILE: crates/content-sources/src/providers/googlebooks.rs
//! Google Books volumes search

use super::{non_empty, year_prefix};
use crate::{MetadataSource, SourceResult};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use shelfwise_core::Candidate;
use shelfwise_network::Client;
use shelfwise_resilience::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

static A_SERIES_NOVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^A\s+(.+?)\s+Novel$").expect("valid regex"));

static BOOK_N_OF_SERIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Book\s+(\d+)\s+of\s+(.+)").expect("valid regex"));

static SERIES_BOOK_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(.+?)\s+(?:Book|#)\s*(\d+)").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
}

pub struct GoogleBooksSource {
    client: Client,
    limiter: RateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleBooksSource {
    pub fn new(client: Client, limiter: RateLimiter, api_key: Option<String>) -> Self {
        Self {
            client,
            limiter,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        let q = match author {
            Some(author) => format!("{} inauthor:{}", title, author),
            None => title.to_string(),
        };

        let mut query = vec![("q", q.as_str()), ("maxResults", "5")];
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let response: VolumesResponse = self
            .client
            .get_json(&format!("{}/volumes", self.base_url), &query)
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|v| to_candidate(v.volume_info)))
    }
}

/// Pulls a series name and position out of a volume subtitle
///
/// Patterns are tried in order and a later match replaces an earlier one.
fn series_from_subtitle(subtitle: &str) -> (Option<String>, Option<String>) {
    let mut series = None;
    let mut number = None;

    if let Some(caps) = A_SERIES_NOVEL.captures(subtitle) {
        series = Some(caps[1].trim().to_string());
    }

    if let Some(caps) = BOOK_N_OF_SERIES.captures(subtitle) {
        number = Some(caps[1].to_string());
        series = Some(caps[2].trim().to_string());
    }

    if let Some(caps) = SERIES_BOOK_N.captures(subtitle) {
        series = Some(caps[1].trim().to_string());
        number = Some(caps[2].to_string());
    }

    (series, number)
}

fn to_candidate(info: VolumeInfo) -> Option<Candidate> {
    let title = non_empty(info.title.as_deref())?;
    let author = non_empty(info.authors.first().map(String::as_str))?;

    let mut candidate = Candidate::new(author, title, "googlebooks");
    candidate.year = info.published_date.as_deref().and_then(year_prefix);

    if let Some(subtitle) = info.subtitle.as_deref() {
        let (series, number) = series_from_subtitle(subtitle);
        if let Some(series) = series.filter(|s| !s.is_empty()) {
            candidate = candidate.with_series(series, number);
        }
    }

    Some(candidate)
}

#[async_trait]
impl MetadataSource for GoogleBooksSource {
    fn name(&self) -> &'static str {
        "googlebooks"
    }

    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        self.limiter.throttle(|| self.fetch(title, author)).await
    }
}
