// FILE: crates/content-sources/src/search_text.rs
//! Turning messy folder names into search queries

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));

static RELEASE_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\((?:Unabridged|Abridged|\d{4}|MP3|M4B|EPUB|PDF|64k|128k|r\d+\.\d+).*?\)")
        .expect("valid regex")
});

static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(mp3|m4b|m4a|epub|pdf|mobi)$").expect("valid regex"));

static TRAILING_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+by\s+[\w\s]+$").expect("valid regex"));

static NOT_AN_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d{4}|book|vol|part|\[").expect("valid regex"));

/// Separators tried in order when splitting `Author - Title`
const SEPARATORS: [&str; 4] = [" - ", " / ", " _ ", " – "];

/// An author-looking prefix must be shorter than this
const MAX_AUTHOR_LEN: usize = 50;

/// Below this many characters a cleaned title is not worth searching for
pub const MIN_QUERY_LEN: usize = 3;

/// Strips release noise from a title
///
/// Removes bracketed tags, release parentheticals such as `(Unabridged)` or
/// `(2019)`, a trailing file extension and a trailing `by Someone`.
pub fn clean_search_title(messy: &str) -> String {
    let text = BRACKETED.replace_all(messy, "");
    let text = RELEASE_PARENS.replace_all(&text, "");
    let text = FILE_EXTENSION.replace_all(&text, "");
    let text = TRAILING_BY.replace_all(&text, "");
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .to_string()
}

/// Splits `Author - Title` style names on the first known separator
///
/// The prefix only counts as an author when it is short and does not look
/// like a year, volume or tag. Otherwise the whole name is the title.
pub fn split_author_title(name: &str) -> (Option<String>, String) {
    for separator in SEPARATORS {
        let Some((left, right)) = name.split_once(separator) else {
            continue;
        };

        let author = left.trim();
        let title = right.trim();
        if !author.is_empty()
            && author.chars().count() < MAX_AUTHOR_LEN
            && !NOT_AN_AUTHOR.is_match(author)
        {
            return (Some(author.to_string()), title.to_string());
        }
    }

    (None, name.trim().to_string())
}
