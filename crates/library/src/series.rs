//! Series name and position from title strings

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that mark an author folder as really being a series
const SERIES_INDICATORS: &[&str] = &[
    "series",
    "saga",
    "cycle",
    "chronicles",
    "trilogy",
    "collection",
    "edition",
    "novels",
    "books",
    "tales",
    "adventures",
    "mysteries",
];

/// How the title text relates to the series after a match
#[derive(Clone, Copy)]
enum TitleFrom {
    /// The title follows the number
    Subtitle,
    /// No subtitle; the series name doubles as the title
    SeriesName,
    /// Only a number was found; series stays unknown
    Prefix,
}

struct SeriesPattern {
    regex: Lazy<Regex>,
    title: TitleFrom,
}

macro_rules! series_pattern {
    ($re:expr, $title:expr) => {
        SeriesPattern {
            regex: Lazy::new(|| Regex::new($re).expect("valid regex")),
            title: $title,
        }
    };
}

/// Checked in order; the first match wins
static PATTERNS: [SeriesPattern; 6] = [
    // "The Firefly Series, Book 8: Coup de Grace", "Mistborn Book 1: The Final Empire"
    series_pattern!(
        r"(?i)^(?:The\s+)?(.+?)\s*(?:Series)?,?\s*Book\s+(\d+)\s*[:\s-]+(.+)$",
        TitleFrom::Subtitle
    ),
    // "The Expanse #3 - Abaddon's Gate"
    series_pattern!(r"^(.+?)\s*#(\d+)\s*[:\s-]+(.+)$", TitleFrom::Subtitle),
    // "Series Book N - Title"
    series_pattern!(r"(?i)^(.+?)\s+Book\s+(\d+)\s*[:\s-]+(.+)$", TitleFrom::Subtitle),
    // "Dark One Book 1"
    series_pattern!(r"(?i)^(.+?)\s+Book\s+(\d+)\s*$", TitleFrom::SeriesName),
    // "Mistborn #1"
    series_pattern!(r"^(.+?)\s*#(\d+)\s*$", TitleFrom::SeriesName),
    // "Ivypool's Heart (Book 17)"
    series_pattern!(r"(?i)^(.+?)\s*\(Book\s+(\d+)\)\s*$", TitleFrom::Prefix),
];

static TRAILING_SERIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*Series\s*$").expect("valid regex"));

/// Series information found in a title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMatch {
    pub series: Option<String>,
    pub number: Option<u32>,
    pub title: String,
}

/// Extracts series, number and remaining title from a title string
///
/// Windows-safe colon look-alikes are read as colons. Without a match the
/// title comes back unchanged with no series and no number.
pub fn extract_series_from_title(title: &str) -> SeriesMatch {
    let normalized = title.replace(['\u{A789}', '\u{FF1A}'], ":");

    for pattern in PATTERNS.iter() {
        let Some(caps) = pattern.regex.captures(&normalized) else {
            continue;
        };
        let head = caps.get(1).map_or("", |m| m.as_str()).trim();
        let number = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());

        return match pattern.title {
            TitleFrom::Subtitle => {
                let series = TRAILING_SERIES.replace(head, "").trim().to_string();
                SeriesMatch {
                    series: Some(series),
                    number,
                    title: caps.get(3).map_or("", |m| m.as_str()).trim().to_string(),
                }
            }
            TitleFrom::SeriesName => SeriesMatch {
                series: Some(head.to_string()),
                number,
                title: head.to_string(),
            },
            TitleFrom::Prefix => SeriesMatch {
                series: None,
                number,
                title: head.to_string(),
            },
        };
    }

    SeriesMatch {
        series: None,
        number: None,
        title: title.to_string(),
    }
}

static SERIES_INDICATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", SERIES_INDICATORS.join("|"))).expect("valid regex")
});

/// Returns true if a name contains one of the series indicator words
pub fn has_series_indicator(name: &str) -> bool {
    SERIES_INDICATOR.is_match(name)
}

/// Series resolved for a rename proposal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredSeries {
    pub series: Option<String>,
    pub series_num: Option<String>,
    /// Replacement for the proposed title, when the series came out of it
    pub title: Option<String>,
}

/// Fills in a series the parser did not report
///
/// The original title is tried first. If it yields only a number and the
/// original author folder reads like a series name, that folder becomes the
/// series. Finally the proposed title is tried, in which case its subtitle
/// replaces the proposed title.
pub fn infer_series(
    original_author: &str,
    original_title: &str,
    proposed_title: &str,
) -> InferredSeries {
    let from_original = extract_series_from_title(original_title);
    if let Some(series) = from_original.series {
        log::debug!(
            "Series '{}' #{:?} from original title '{}'",
            series,
            from_original.number,
            original_title
        );
        return InferredSeries {
            series: Some(series),
            series_num: from_original.number.map(|n| n.to_string()),
            title: None,
        };
    }

    if let Some(number) = from_original.number {
        if has_series_indicator(original_author) {
            log::debug!(
                "Using author folder '{}' as series #{}",
                original_author,
                number
            );
            return InferredSeries {
                series: Some(original_author.trim().to_string()),
                series_num: Some(number.to_string()),
                title: None,
            };
        }
    }

    if !proposed_title.trim().is_empty() {
        let from_proposed = extract_series_from_title(proposed_title);
        if let Some(series) = from_proposed.series {
            return InferredSeries {
                series: Some(series),
                series_num: from_proposed.number.map(|n| n.to_string()),
                title: Some(from_proposed.title),
            };
        }
    }

    InferredSeries::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_comma_book_colon() {
        let m = extract_series_from_title("The Firefly Series, Book 8: Coup de Grâce");
        assert_eq!(m.series.as_deref(), Some("Firefly"));
        assert_eq!(m.number, Some(8));
        assert_eq!(m.title, "Coup de Grâce");
    }

    #[test]
    fn test_windows_colon_lookalike() {
        let m = extract_series_from_title("The Firefly Series, Book 8\u{A789} Firefly\u{A789} Coup de Grâce");
        assert_eq!(m.series.as_deref(), Some("Firefly"));
        assert_eq!(m.title, "Firefly: Coup de Grâce");
    }

    #[test]
    fn test_hash_with_subtitle() {
        let m = extract_series_from_title("The Expanse #3 - Abaddon's Gate");
        assert_eq!(m.series.as_deref(), Some("The Expanse"));
        assert_eq!(m.number, Some(3));
        assert_eq!(m.title, "Abaddon's Gate");
    }

    #[test]
    fn test_hash_without_subtitle() {
        let m = extract_series_from_title("Mistborn #1");
        assert_eq!(m.series.as_deref(), Some("Mistborn"));
        assert_eq!(m.number, Some(1));
        assert_eq!(m.title, "Mistborn");
    }

    #[test]
    fn test_book_without_subtitle() {
        let m = extract_series_from_title("Dark One Book 1");
        assert_eq!(m.series.as_deref(), Some("Dark One"));
        assert_eq!(m.title, "Dark One");
    }

    #[test]
    fn test_parenthesized_book_number() {
        let m = extract_series_from_title("Ivypool's Heart (Book 17)");
        assert_eq!(m.series, None);
        assert_eq!(m.number, Some(17));
        assert_eq!(m.title, "Ivypool's Heart");
    }

    #[test]
    fn test_plain_title() {
        let m = extract_series_from_title("The Hollow Man");
        assert_eq!(m.series, None);
        assert_eq!(m.number, None);
        assert_eq!(m.title, "The Hollow Man");
    }

    #[test]
    fn test_infer_from_original_keeps_proposed_title() {
        let inferred = infer_series(
            "Brandon Sanderson",
            "The Reckoners, Book 2 - Firefight",
            "Firefight",
        );
        assert_eq!(inferred.series.as_deref(), Some("Reckoners"));
        assert_eq!(inferred.series_num.as_deref(), Some("2"));
        assert_eq!(inferred.title, None);
    }

    #[test]
    fn test_infer_author_folder_as_series() {
        let inferred = infer_series("Warriors Series", "Ivypool's Heart (Book 17)", "Ivypool's Heart");
        assert_eq!(inferred.series.as_deref(), Some("Warriors Series"));
        assert_eq!(inferred.series_num.as_deref(), Some("17"));
    }

    #[test]
    fn test_infer_from_proposed_title() {
        let inferred = infer_series("Brandon Sanderson", "Final Empire", "Mistborn Book 1: The Final Empire");
        assert_eq!(inferred.series.as_deref(), Some("Mistborn"));
        assert_eq!(inferred.title.as_deref(), Some("The Final Empire"));
    }

    #[test]
    fn test_series_indicator_needs_whole_word() {
        assert!(has_series_indicator("Warriors Series"));
        assert!(has_series_indicator("The Dresden Files Books"));
        assert!(!has_series_indicator("Bookworm"));
        assert!(!has_series_indicator("Sagan"));
        assert!(!has_series_indicator("Talesin"));
    }

    #[test]
    fn test_infer_nothing() {
        assert_eq!(
            infer_series("Steven Boyett", "The Hollow Man", "The Hollow Man"),
            InferredSeries::default()
        );
    }
}
