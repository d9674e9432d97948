// FILE: crates/content-sources/src/providers/hardcover.rs
//! Hardcover GraphQL search

use super::non_empty;
use crate::{MetadataSource, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shelfwise_core::Candidate;
use shelfwise_network::Client;
use shelfwise_resilience::RateLimiter;

const DEFAULT_ENDPOINT: &str = "https://api.hardcover.app/v1/graphql";

const SEARCH_QUERY: &str = "query SearchBooks($query: String!) { search(query: $query, limit: 5) { books { title contributions { author { name } } releaseYear } } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    books: Vec<Book>,
}

#[derive(Debug, Deserialize)]
struct Book {
    title: Option<String>,
    #[serde(default)]
    contributions: Vec<Contribution>,
    #[serde(rename = "releaseYear")]
    release_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Contribution {
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

/// Hardcover needs an API token; without one the source reports unavailable
pub struct HardcoverSource {
    client: Client,
    limiter: RateLimiter,
    token: Option<String>,
    endpoint: String,
}

impl HardcoverSource {
    pub fn new(client: Client, limiter: RateLimiter, token: Option<String>) -> Self {
        Self {
            client,
            limiter,
            token: token.filter(|t| !t.trim().is_empty()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };

        let query = match author {
            Some(author) => format!("{} {}", title, author),
            None => title.to_string(),
        };
        let body = json!({
            "query": SEARCH_QUERY,
            "variables": { "query": query },
        });
        let bearer = format!("Bearer {}", token);

        let response: GraphQlResponse = self
            .client
            .post_json(&self.endpoint, &[("Authorization", bearer.as_str())], &body)
            .await?;

        Ok(first_book(response).and_then(to_candidate))
    }
}

fn first_book(response: GraphQlResponse) -> Option<Book> {
    response.data?.search?.books.into_iter().next()
}

fn to_candidate(book: Book) -> Option<Candidate> {
    let title = non_empty(book.title.as_deref())?;
    let author = non_empty(
        book.contributions
            .first()
            .and_then(|c| c.author.as_ref())
            .and_then(|a| a.name.as_deref()),
    )?;

    let mut candidate = Candidate::new(author, title, "hardcover");
    candidate.year = book.release_year;
    Some(candidate)
}

#[async_trait]
impl MetadataSource for HardcoverSource {
    fn name(&self) -> &'static str {
        "hardcover"
    }

    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        self.limiter.throttle(|| self.fetch(title, author)).await
    }

    fn is_available(&self) -> bool {
        self.token.is_some()
    }
}
