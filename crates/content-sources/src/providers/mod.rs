// FILE: crates/content-sources/src/providers/mod.rs
//! Metadata source implementations, in lookup priority order

mod audnexus;
mod catalog;
mod googlebooks;
mod hardcover;
mod openlibrary;

pub use audnexus::AudnexusSource;
pub use catalog::LocalCatalogSource;
pub use googlebooks::GoogleBooksSource;
pub use hardcover::HardcoverSource;
pub use openlibrary::OpenLibrarySource;

use crate::{MetadataSource, SourceResult};
use shelfwise_config::{ProvidersConfig, SourceSettings};
use shelfwise_database::DbPool;
use shelfwise_network::{Client, ClientConfig};
use once_cell::sync::Lazy;
use shelfwise_resilience::RateLimiter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Limiters by source name and delay, shared by every `build_sources` call
static LIMITERS: Lazy<Mutex<HashMap<(String, Duration), RateLimiter>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Builds the enabled sources in priority order
///
/// The local catalog comes first when a pool is given, then the
/// audiobook-specific source, then the general book catalogs.
pub fn build_sources(
    config: &ProvidersConfig,
    pool: Option<DbPool>,
) -> SourceResult<Vec<Arc<dyn MetadataSource>>> {
    let client = Client::with_config(ClientConfig::with_timeout(Duration::from_secs(
        config.request_timeout_secs,
    )))?;

    let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::new();

    if config.local_catalog {
        if let Some(pool) = pool {
            sources.push(Arc::new(LocalCatalogSource::new(pool)));
        }
    }

    if config.audnexus.enabled {
        sources.push(Arc::new(AudnexusSource::new(
            client.clone(),
            limiter("audnexus", &config.audnexus),
        )));
    }

    if config.openlibrary.enabled {
        sources.push(Arc::new(OpenLibrarySource::new(
            client.clone(),
            limiter("openlibrary", &config.openlibrary),
        )));
    }

    if config.googlebooks.enabled {
        sources.push(Arc::new(GoogleBooksSource::new(
            client.clone(),
            limiter("googlebooks", &config.googlebooks),
            config.google_books_api_key.clone(),
        )));
    }

    if config.hardcover.enabled {
        sources.push(Arc::new(HardcoverSource::new(
            client,
            limiter("hardcover", &config.hardcover),
            config.hardcover_token.clone(),
        )));
    }

    log::debug!(
        "Metadata sources: {}",
        sources
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(sources)
}

fn limiter(name: &str, settings: &SourceSettings) -> RateLimiter {
    shared_limiter(name, settings.min_delay())
}

/// The process-wide limiter for one source
///
/// Every source set built in this process throttles through the same
/// limiter for a given provider and delay.
fn shared_limiter(name: &str, min_delay: Duration) -> RateLimiter {
    let mut limiters = LIMITERS.lock().unwrap_or_else(|e| e.into_inner());
    limiters
        .entry((name.to_string(), min_delay))
        .or_insert_with(|| RateLimiter::new(name, min_delay))
        .clone()
}

/// First four characters of a date string as a year
pub(crate) fn year_prefix(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse().ok())
}

/// Trims a field and drops it when empty
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
