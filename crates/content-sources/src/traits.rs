// FILE: crates/content-sources/src/traits.rs
//! Collaborator seams: ranked metadata sources and the name database

use crate::SourceResult;
use async_trait::async_trait;
use shelfwise_core::Candidate;

/// A metadata provider that answers one title query with its best hit
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Short identifier, stored as `Candidate::source`
    fn name(&self) -> &'static str;

    /// Looks up `title`, optionally narrowed by `author`
    ///
    /// `Ok(None)` means the source had nothing usable. Hits always carry a
    /// non-empty title and author.
    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>>;

    /// Returns false when the source is not configured (missing token etc.)
    fn is_available(&self) -> bool {
        true
    }
}

/// Outcome of a name database lookup
///
/// A failed lookup is never the same as "not found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found,
    NotFound,
    Failed(String),
}

impl LookupResult {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Found)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LookupResult::Failed(_))
    }
}

/// Read-only lookups against known authors and series
#[async_trait]
pub trait NameDatabase: Send + Sync {
    async fn lookup_author(&self, name: &str) -> LookupResult;

    async fn lookup_series(&self, name: &str) -> LookupResult;
}

#[cfg(test)]
mod trait_tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl MetadataSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn search(
            &self,
            title: &str,
            _author: Option<&str>,
        ) -> SourceResult<Option<Candidate>> {
            Ok(Some(Candidate::new("Someone", title, self.name())))
        }
    }

    #[tokio::test]
    async fn test_default_availability() {
        let source = Fixed;
        assert!(source.is_available());
        let hit = source.search("Dune", None).await.unwrap().unwrap();
        assert_eq!(hit.source, "fixed");
    }

    #[test]
    fn test_lookup_result_helpers() {
        assert!(LookupResult::Found.is_found());
        assert!(!LookupResult::NotFound.is_failed());
        assert!(LookupResult::Failed("locked".to_string()).is_failed());
    }
}
