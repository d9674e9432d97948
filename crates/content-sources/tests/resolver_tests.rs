// crates/content-sources/tests/resolver_tests.rs
//! Resolver behavior against scripted sources

use async_trait::async_trait;
use shelfwise_content_sources::{
    CandidateResolver, MetadataSource, SearchHints, SourceError, SourceResult,
};
use shelfwise_core::Candidate;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ScriptedSource {
    name: &'static str,
    with_author: Option<Candidate>,
    without_author: Option<Candidate>,
    fails: bool,
    unavailable: bool,
    queries: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedSource {
    fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn answering(mut self, hit: Candidate) -> Self {
        self.with_author = Some(hit.clone());
        self.without_author = Some(hit);
        self
    }

    fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl MetadataSource for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, title: &str, author: Option<&str>) -> SourceResult<Option<Candidate>> {
        self.queries
            .lock()
            .unwrap()
            .push((title.to_string(), author.map(str::to_string)));

        if self.fails {
            return Err(SourceError::Parse("unexpected payload".to_string()));
        }

        Ok(match author {
            Some(_) => self.with_author.clone(),
            None => self.without_author.clone(),
        })
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}

fn hit(author: &str, title: &str, source: &str) -> Candidate {
    Candidate::new(author, title, source)
}

fn resolver(sources: &[Arc<ScriptedSource>]) -> CandidateResolver {
    CandidateResolver::new(
        sources
            .iter()
            .map(|s| s.clone() as Arc<dyn MetadataSource>)
            .collect(),
    )
}

#[tokio::test]
async fn test_first_non_garbage_hit_wins() {
    let garbage = Arc::new(ScriptedSource::named("a").answering(hit(
        "Someone",
        "Cooking Basics",
        "a",
    )));
    let good = Arc::new(ScriptedSource::named("b").answering(hit(
        "Brandon Sanderson",
        "The Final Empire",
        "b",
    )));
    let never = Arc::new(ScriptedSource::named("c").answering(hit(
        "Brandon Sanderson",
        "The Final Empire",
        "c",
    )));

    let result = resolver(&[garbage.clone(), good.clone(), never.clone()])
        .resolve("The Final Empire", Some("Sanderson"))
        .await
        .expect("a hit");

    assert_eq!(result.source, "b");
    assert_eq!(garbage.calls(), 1);
    assert_eq!(never.calls(), 0);
}

#[tokio::test]
async fn test_failures_and_unavailable_sources_are_skipped() {
    let failing = Arc::new(ScriptedSource {
        fails: true,
        ..ScriptedSource::named("broken")
    });
    let offline = Arc::new(ScriptedSource {
        unavailable: true,
        ..ScriptedSource::named("offline").answering(hit("X", "Dune", "offline"))
    });
    let good = Arc::new(ScriptedSource::named("good").answering(hit(
        "Frank Herbert",
        "Dune",
        "good",
    )));

    let resolver = resolver(&[failing.clone(), offline.clone(), good]);
    assert_eq!(resolver.source_names(), vec!["broken", "good"]);

    let result = resolver.resolve("Dune", None).await.expect("a hit");
    assert_eq!(result.author, "Frank Herbert");
    assert_eq!(failing.calls(), 1);
    assert_eq!(offline.calls(), 0);
}

#[tokio::test]
async fn test_incomplete_hits_are_ignored() {
    let incomplete = Arc::new(ScriptedSource::named("a").answering(hit("", "Dune", "a")));
    assert!(resolver(&[incomplete]).resolve("Dune", None).await.is_none());
}

#[tokio::test]
async fn test_short_query_is_not_searched() {
    let source = Arc::new(ScriptedSource::named("a").answering(hit("Stephen King", "It", "a")));
    assert!(resolver(&[source.clone()]).resolve("It", None).await.is_none());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_resolve_all_collects_distinct_candidates() {
    let first = Arc::new(ScriptedSource::named("a").answering(hit(
        "Brandon Sanderson",
        "The Final Empire",
        "a",
    )));
    let second = Arc::new(ScriptedSource {
        without_author: Some(hit("Someone Else", "The Final Empire", "b")),
        ..ScriptedSource::named("b")
    });
    let duplicate = Arc::new(ScriptedSource::named("c").answering(hit(
        "brandon sanderson",
        "the final empire",
        "c",
    )));

    let candidates = resolver(&[first.clone(), second, duplicate])
        .resolve_all("The Final Empire [MP3]", Some("Brandon Sanderson"))
        .await;

    let authors: Vec<_> = candidates.iter().map(|c| c.author.as_str()).collect();
    assert_eq!(authors, vec!["Brandon Sanderson", "Someone Else"]);

    let queries = first.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![
            (
                "The Final Empire".to_string(),
                Some("Brandon Sanderson".to_string())
            ),
            ("The Final Empire".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_resolve_all_without_author_queries_once() {
    let source = Arc::new(ScriptedSource::named("a").answering(hit(
        "Andy Weir",
        "The Martian",
        "a",
    )));
    let candidates = resolver(&[source.clone()])
        .resolve_all("The Martian", None)
        .await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_lookup_splits_messy_name() {
    let source = Arc::new(ScriptedSource::named("a").answering(hit(
        "Andy Weir",
        "Project Hail Mary",
        "a",
    )));
    let result = resolver(&[source.clone()])
        .lookup("Andy Weir - Project Hail Mary (Unabridged)", &SearchHints::default())
        .await;

    assert!(result.is_some());
    let queries = source.queries.lock().unwrap().clone();
    assert_eq!(
        queries[0],
        (
            "Project Hail Mary".to_string(),
            Some("Andy Weir".to_string())
        )
    );
}

#[tokio::test]
async fn test_lookup_prefers_tag_title_over_chapter_label() {
    let source = Arc::new(ScriptedSource::named("a").answering(hit(
        "Andy Weir",
        "The Martian",
        "a",
    )));
    let hints = SearchHints {
        author: Some("Andy Weir".to_string()),
        title: Some("The Martian".to_string()),
    };

    let result = resolver(&[source.clone()])
        .lookup("Chapter 01 [MP3]", &hints)
        .await
        .expect("a hit");

    assert_eq!(result.title, "The Martian");
    let queries = source.queries.lock().unwrap().clone();
    assert_eq!(
        queries[0],
        ("The Martian".to_string(), Some("Andy Weir".to_string()))
    );
}
