// FILE: crates/content-sources/src/similarity.rs
//! Word-overlap title similarity and the garbage-match filter
//!
//! Metadata sources answer loose queries with whatever they have, so every
//! hit is compared against the query before it is trusted.

use std::collections::HashSet;

/// Hits scoring below this are discarded
pub const GARBAGE_THRESHOLD: f64 = 0.3;

/// Lower bar for short queries
pub const SHORT_QUERY_THRESHOLD: f64 = 0.2;

/// Queries with at most this many significant words count as short
pub const SHORT_QUERY_WORDS: usize = 2;

/// Words of this length or shorter are not significant
const INSIGNIFICANT_LEN: usize = 2;

const STOP_WORDS: [&str; 13] = [
    "the", "a", "an", "of", "and", "or", "in", "to", "for", "by", "part", "book", "volume",
];

fn words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the two titles' word sets, stop words removed
///
/// Returns 0.0 when either side has no words left.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let left = words(a);
    let right = words(b);

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let total = left.union(&right).count();
    shared as f64 / total as f64
}

/// Number of words longer than two characters
pub fn significant_word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().count() > INSIGNIFICANT_LEN)
        .count()
}

/// Returns true if `result` is too unlike `query` to be the same book
pub fn is_garbage_match(query: &str, result: &str) -> bool {
    let similarity = title_similarity(query, result);
    let threshold = if significant_word_count(query) <= SHORT_QUERY_WORDS {
        SHORT_QUERY_THRESHOLD
    } else {
        GARBAGE_THRESHOLD
    };

    let garbage = similarity < threshold;
    if garbage {
        log::info!(
            "Garbage match rejected: '{}' vs '{}' (similarity: {:.2})",
            query,
            result,
            similarity
        );
    }
    garbage
}
