// FILE: crates/content-sources/src/providers/openlibrary.rs
//! Open Library search

use super::non_empty;
use crate::{MetadataSource, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use shelfwise_core::Candidate;
use shelfwise_network::Client;
use shelfwise_resilience::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<Doc>,
}

#[derive(Debug, Deserialize)]
struct Doc {
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
}

pub struct OpenLibrarySource {
    client: Client,
    limiter: RateLimiter,
    base_url: String,
}

impl OpenLibrarySource {
    pub fn new(client: Client, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        let mut query = vec![("title", title), ("limit", "5")];
        if let Some(author) = author {
            query.push(("author", author));
        }

        let response: SearchResponse = self
            .client
            .get_json(&format!("{}/search.json", self.base_url), &query)
            .await?;

        Ok(response.docs.into_iter().next().and_then(to_candidate))
    }
}

fn to_candidate(doc: Doc) -> Option<Candidate> {
    let title = non_empty(doc.title.as_deref())?;
    let author = non_empty(doc.author_name.first().map(String::as_str))?;

    let mut candidate = Candidate::new(author, title, "openlibrary");
    candidate.year = doc.first_publish_year;
    Some(candidate)
}

#[async_trait]
impl MetadataSource for OpenLibrarySource {
    fn name(&self) -> &'static str {
        "openlibrary"
    }

    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        self.limiter.throttle(|| self.fetch(title, author)).await
    }
}
