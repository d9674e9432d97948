//! Drastic author change detection
//!
//! A change is drastic when the proposed author is likely a different person,
//! as opposed to a formatting fix like expanded initials or a full name.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Below this share of shared name tokens a change is drastic
pub const OVERLAP_THRESHOLD: f64 = 0.3;

/// Tokens shorter than this are initials and do not count
pub const MIN_TOKEN_LEN: usize = 2;

/// Author folder names that stand for "no author"
pub const PLACEHOLDER_AUTHORS: &[&str] = &[
    "unknown",
    "various",
    "various authors",
    "va",
    "n/a",
    "none",
    "audiobook",
    "audiobooks",
    "ebook",
    "ebooks",
    "book",
    "books",
    "author",
    "authors",
    "narrator",
    "untitled",
    "no author",
];

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

fn name_tokens(name: &str) -> BTreeSet<String> {
    PUNCTUATION
        .replace_all(&name.to_lowercase(), " ")
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

fn longest(tokens: &BTreeSet<String>) -> Option<&str> {
    tokens
        .iter()
        .max_by_key(|t| t.chars().count())
        .map(String::as_str)
}

/// Returns true if replacing `old_author` with `new_author` changes the person
pub fn is_drastic(old_author: &str, new_author: &str) -> bool {
    let old_norm = old_author.trim().to_lowercase();
    let new_norm = new_author.trim().to_lowercase();

    if old_norm.is_empty() || new_norm.is_empty() {
        return false;
    }
    if PLACEHOLDER_AUTHORS.contains(&old_norm.as_str()) {
        return false;
    }
    if old_norm.split_whitespace().eq(new_norm.split_whitespace()) {
        return false;
    }

    let old_tokens = name_tokens(old_author);
    let new_tokens = name_tokens(new_author);
    let shared = old_tokens.intersection(&new_tokens).count();

    if shared == 0 {
        return match (longest(&old_tokens), longest(&new_tokens)) {
            (Some(old_last), Some(new_last)) => {
                !(old_last.contains(new_last) || new_last.contains(old_last))
            }
            _ => true,
        };
    }

    let total = old_tokens.len().max(new_tokens.len());
    (shared as f64 / total as f64) < OVERLAP_THRESHOLD
}
