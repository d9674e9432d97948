// FILE: crates/content-sources/src/providers/audnexus.rs
//! Audnexus audiobook metadata

use super::{non_empty, year_prefix};
use crate::{MetadataSource, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use shelfwise_core::Candidate;
use shelfwise_network::Client;
use shelfwise_resilience::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://api.audnex.us";

#[derive(Debug, Deserialize)]
struct AudnexusBook {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<Person>,
    #[serde(default, rename = "releaseDate")]
    release_date: Option<String>,
    #[serde(default)]
    narrators: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    name: Option<String>,
}

/// Audiobook-specific source; the only one that knows narrators
pub struct AudnexusSource {
    client: Client,
    limiter: RateLimiter,
    base_url: String,
}

impl AudnexusSource {
    pub fn new(client: Client, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the source at another host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        let query = match author {
            Some(author) => format!("{} {}", title, author),
            None => title.to_string(),
        };

        let books: Vec<AudnexusBook> = self
            .client
            .get_json_with_headers(
                &format!("{}/books", self.base_url),
                &[("title", query.as_str())],
                &[("Accept", "application/json")],
            )
            .await?;

        Ok(books.into_iter().next().and_then(to_candidate))
    }
}

fn to_candidate(book: AudnexusBook) -> Option<Candidate> {
    let title = non_empty(book.title.as_deref())?;
    let author = non_empty(book.authors.first().and_then(|a| a.name.as_deref()))?;

    let mut candidate = Candidate::new(author, title, "audnexus");
    candidate.year = book.release_date.as_deref().and_then(year_prefix);
    candidate.narrator = non_empty(book.narrators.first().and_then(|n| n.name.as_deref()));
    Some(candidate)
}

#[async_trait]
impl MetadataSource for AudnexusSource {
    fn name(&self) -> &'static str {
        "audnexus"
    }

    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        self.limiter.throttle(|| self.fetch(title, author)).await
    }
}
