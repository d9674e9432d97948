// FILE: crates/content-sources/src/lib.rs
//! Metadata sources, title similarity and the candidate resolver

mod names;
pub mod providers;
mod resolver;
pub mod search_text;
pub mod similarity;
mod traits;

pub use names::SqliteNameDatabase;
pub use providers::{
    build_sources, AudnexusSource, GoogleBooksSource, HardcoverSource, LocalCatalogSource,
    OpenLibrarySource,
};
pub use resolver::{CandidateResolver, SearchHints};
pub use traits::{LookupResult, MetadataSource, NameDatabase};

use thiserror::Error;

/// Result type for content source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors from content sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport or HTTP status failure
    #[error("Network error: {0}")]
    Network(#[from] shelfwise_network::NetworkError),

    /// Payload did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Query was empty or unusable
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Local database failure
    #[error("Database error: {0}")]
    Database(#[from] shelfwise_core::AppError),

    /// Source is not configured
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}
