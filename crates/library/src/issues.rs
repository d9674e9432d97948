//! Issue detection for author and title folder names
//!
//! Each check is a rule in an ordered table, so a rule can be tested or
//! extended on its own. The detector itself only walks the tables.

use crate::patterns::{
    self, clean_title, lowercase_words, matches_name_shape, NOT_FIRST_NAMES, NOT_SURNAMES,
    SYSTEM_FOLDERS, TITLE_WORDS,
};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use shelfwise_core::MAX_PRIORITY;
use std::fmt;

/// How many issues are spelled out in a queue reason
const REASON_ISSUES: usize = 3;

/// A defect found in a folder name or folder layout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Issue {
    // Author folder
    SystemFolderNotAuthor,
    YearInAuthor,
    TitleFragmentNotName,
    NotASurname,
    TitleWordsInAuthor,
    NotANamePattern,
    LastnameFirstnameFormat,
    FormatJunkInAuthor,
    NarratorInAuthor,
    AuthorIsNumber,
    AuthorStartsWithNumber,
    AuthorContainsBookNumber,

    // Title folder
    MultiBookCollection,
    AuthorInTitle,
    ByAuthorInTitle,
    YearInTitle,
    QualityInfoInTitle,
    NarratorInTitle,
    DurationInTitle,
    SeriesPrefixFormat,
    CatalogIdInTitle,
    TitleLooksLikeAuthor,
    Junk(String),

    // Directory level
    DiscFolders(usize),
    EbookFiles(usize),
    DuplicateFile(String),
    AuthorFolderHasAudioFiles,
    AuthorFolderOnlyHasDiscFolders,
    SeriesFolder,
    MultiBookFiles,
    LooseFiles(usize),
    StructureReversed,

    /// The name database could not be consulted; roles come from patterns only
    DbLookupFailed,
}

impl Issue {
    /// Markers describe how a result was produced, not a defect of the folder
    pub fn is_marker(&self) -> bool {
        matches!(self, Issue::DbLookupFailed)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::SystemFolderNotAuthor => f.write_str("system_folder_not_author"),
            Issue::YearInAuthor => f.write_str("year_in_author"),
            Issue::TitleFragmentNotName => f.write_str("title_fragment_not_name"),
            Issue::NotASurname => f.write_str("not_a_surname"),
            Issue::TitleWordsInAuthor => f.write_str("title_words_in_author"),
            Issue::NotANamePattern => f.write_str("not_a_name_pattern"),
            Issue::LastnameFirstnameFormat => f.write_str("lastname_firstname_format"),
            Issue::FormatJunkInAuthor => f.write_str("format_junk_in_author"),
            Issue::NarratorInAuthor => f.write_str("narrator_in_author"),
            Issue::AuthorIsNumber => f.write_str("author_is_number"),
            Issue::AuthorStartsWithNumber => f.write_str("author_starts_with_number"),
            Issue::AuthorContainsBookNumber => f.write_str("author_contains_book_number"),
            Issue::MultiBookCollection => f.write_str("multi_book_collection"),
            Issue::AuthorInTitle => f.write_str("author_in_title"),
            Issue::ByAuthorInTitle => f.write_str("by_author_in_title"),
            Issue::YearInTitle => f.write_str("year_in_title"),
            Issue::QualityInfoInTitle => f.write_str("quality_info_in_title"),
            Issue::NarratorInTitle => f.write_str("narrator_in_title"),
            Issue::DurationInTitle => f.write_str("duration_in_title"),
            Issue::SeriesPrefixFormat => f.write_str("series_prefix_format"),
            Issue::CatalogIdInTitle => f.write_str("catalog_id_in_title"),
            Issue::TitleLooksLikeAuthor => f.write_str("title_looks_like_author"),
            Issue::Junk(rule) => write!(f, "junk:{}", rule),
            Issue::DiscFolders(n) => write!(f, "has_{}_disc_folders", n),
            Issue::EbookFiles(n) => write!(f, "has_{}_ebook_files", n),
            Issue::DuplicateFile(name) => write!(f, "duplicate_file:{}", name),
            Issue::AuthorFolderHasAudioFiles => f.write_str("author_folder_has_audio_files"),
            Issue::AuthorFolderOnlyHasDiscFolders => {
                f.write_str("author_folder_only_has_disc_folders")
            }
            Issue::SeriesFolder => f.write_str("series_folder"),
            Issue::MultiBookFiles => f.write_str("multi_book_files"),
            Issue::LooseFiles(n) => write!(f, "loose_files:{}", n),
            Issue::StructureReversed => f.write_str("structure_reversed"),
            Issue::DbLookupFailed => f.write_str("db_lookup_failed"),
        }
    }
}

/// Issues of one folder with the queue priority and reason they imply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueReport {
    pub issues: Vec<Issue>,
}

impl IssueReport {
    /// Builds a report, dropping markers and duplicates
    pub fn new(issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut report = Self::default();
        for issue in issues {
            report.push(issue);
        }
        report
    }

    pub fn push(&mut self, issue: Issue) {
        if !issue.is_marker() && !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn contains(&self, issue: &Issue) -> bool {
        self.issues.contains(issue)
    }

    /// `min(issue count, 10)`
    pub fn priority(&self) -> i64 {
        (self.issues.len() as i64).min(MAX_PRIORITY)
    }

    /// First three issues joined, with a "+N more" suffix when truncated
    pub fn reason(&self) -> String {
        let shown: Vec<String> = self
            .issues
            .iter()
            .take(REASON_ISSUES)
            .map(|i| i.to_string())
            .collect();
        let mut reason = shown.join("; ");
        if self.issues.len() > REASON_ISSUES {
            reason.push_str(&format!(" (+{} more)", self.issues.len() - REASON_ISSUES));
        }
        reason
    }
}

struct PatternRule {
    issue: Issue,
    pattern: &'static Lazy<Regex>,
}

static YEAR_IN_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19[0-9]{2}|20[0-2][0-9])\b").expect("valid regex"));
static LASTNAME_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+,\s+[A-Z][a-z]+").expect("valid regex"));
static FORMAT_JUNK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(epub|pdf|mp3|m4b)|[\[\]{}]").expect("valid regex")
});
static NARRATOR_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s-\s[A-Z][a-z]+\s+[A-Z][a-z]+$").expect("valid regex"));
static ONLY_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s").expect("valid regex"));
static BOOK_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bbook\s*\d|\bpart\s*\d|\bvolume\s*\d").expect("valid regex")
});

static AUTHOR_RULES: [PatternRule; 7] = [
    PatternRule {
        issue: Issue::YearInAuthor,
        pattern: &YEAR_IN_AUTHOR,
    },
    PatternRule {
        issue: Issue::LastnameFirstnameFormat,
        pattern: &LASTNAME_FIRST,
    },
    PatternRule {
        issue: Issue::FormatJunkInAuthor,
        pattern: &FORMAT_JUNK,
    },
    PatternRule {
        issue: Issue::NarratorInAuthor,
        pattern: &NARRATOR_SUFFIX,
    },
    PatternRule {
        issue: Issue::AuthorIsNumber,
        pattern: &ONLY_DIGITS,
    },
    PatternRule {
        issue: Issue::AuthorStartsWithNumber,
        pattern: &LEADING_NUMBER,
    },
    PatternRule {
        issue: Issue::AuthorContainsBookNumber,
        pattern: &BOOK_NUMBER,
    },
];

static MULTI_BOOK: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"complete\s+series",
        r"complete\s+audio\s+collection",
        r"\d+[-\s]?book\s+(set|box|collection)",
        r"\d+[-\s]?book\s+and\s+audio",
        r"all\s+\d+\s+books",
        r"books?\s+\d+\s*-\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static YEAR_IN_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19[5-9][0-9]|20[0-2][0-9])\b").expect("valid regex"));
static QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+k\b|\d+kbps|\d+mb|\d+gb").expect("valid regex"));
static NARRATOR_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([A-Z][a-z]+\)\s*$").expect("valid regex"));
static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}\.\d{2}\.\d{2}").expect("valid regex"));
static SERIES_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^.+\s+book\s+\d+\s*[-:]\s*.+").expect("valid regex"));
static CATALOG_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d{4,}\]").expect("valid regex"));

static TITLE_RULES: [PatternRule; 6] = [
    PatternRule {
        issue: Issue::YearInTitle,
        pattern: &YEAR_IN_TITLE,
    },
    PatternRule {
        issue: Issue::QualityInfoInTitle,
        pattern: &QUALITY,
    },
    PatternRule {
        issue: Issue::NarratorInTitle,
        pattern: &NARRATOR_PAREN,
    },
    PatternRule {
        issue: Issue::DurationInTitle,
        pattern: &DURATION,
    },
    PatternRule {
        issue: Issue::SeriesPrefixFormat,
        pattern: &SERIES_PREFIX,
    },
    PatternRule {
        issue: Issue::CatalogIdInTitle,
        pattern: &CATALOG_ID,
    },
];

fn apply_rules(rules: &[PatternRule], text: &str, issues: &mut Vec<Issue>) {
    for rule in rules {
        if rule.pattern.is_match(text) {
            issues.push(rule.issue.clone());
        }
    }
}

/// Checks an author folder name
///
/// A system folder name short-circuits every other check.
pub fn analyze_author(author: &str) -> Vec<Issue> {
    let author = author.trim();
    let lower = author.to_lowercase();
    if SYSTEM_FOLDERS.contains(&lower.as_str()) {
        return vec![Issue::SystemFolderNotAuthor];
    }

    let mut issues = Vec::new();
    let words = lowercase_words(author);
    let mut looks_like_name = matches_name_shape(author);

    if looks_like_name && words.len() >= 2 {
        let first = words[0].trim_end_matches(',');
        let last = words[words.len() - 1].as_str();
        let title_opening = NOT_FIRST_NAMES.contains(&first);
        let title_closing = NOT_SURNAMES.contains(&last);

        if title_opening && title_closing {
            looks_like_name = false;
            issues.push(Issue::TitleFragmentNotName);
        } else if title_closing {
            looks_like_name = false;
            issues.push(Issue::NotASurname);
        } else if title_opening {
            looks_like_name = false;
            issues.push(Issue::TitleWordsInAuthor);
        }
    }

    if !looks_like_name {
        if words.iter().any(|w| TITLE_WORDS.contains(&w.as_str())) {
            issues.push(Issue::TitleWordsInAuthor);
        }
        if author.len() > 3 && words.len() >= 2 {
            issues.push(Issue::NotANamePattern);
        }
    }

    apply_rules(&AUTHOR_RULES, author, &mut issues);
    issues
}

/// Checks a title folder name against its author folder name
///
/// A boxed-set name short-circuits every other check.
pub fn analyze_title(title: &str, author: &str) -> Vec<Issue> {
    let title = title.trim();
    let author = author.trim();
    let title_lower = title.to_lowercase();

    if MULTI_BOOK.iter().any(|p| p.is_match(&title_lower)) {
        return vec![Issue::MultiBookCollection];
    }

    let mut issues = Vec::new();

    if author.split_whitespace().count() >= 2 {
        if title_lower.contains(&author.to_lowercase()) {
            issues.push(Issue::AuthorInTitle);
        }
        let by_author = RegexBuilder::new(&format!(r"\bby\s+{}\b", regex::escape(author)))
            .case_insensitive(true)
            .build();
        if by_author.map(|re| re.is_match(title)).unwrap_or(false) {
            issues.push(Issue::ByAuthorInTitle);
        }
    }

    apply_rules(&TITLE_RULES, title, &mut issues);

    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() == 2
        && words
            .iter()
            .all(|w| w.chars().next().is_some_and(char::is_uppercase))
        && !words
            .iter()
            .any(|w| ["the", "a", "of", "and"].contains(&w.to_lowercase().as_str()))
    {
        issues.push(Issue::TitleLooksLikeAuthor);
    }

    issues
}

/// All name-level issues of an author/title pair
///
/// Deterministic and free of side effects; the same pair always yields the
/// same issues in the same order.
pub fn detect_issues(author: &str, title: &str) -> Vec<Issue> {
    let mut report = IssueReport::new(analyze_author(author));

    let title_issues = analyze_title(title, author);
    let collection = title_issues.contains(&Issue::MultiBookCollection);
    for issue in title_issues {
        report.push(issue);
    }

    if !collection {
        let (_, junk) = clean_title(title);
        for rule in junk {
            report.push(Issue::Junk(rule.to_string()));
        }
    }

    report.issues
}

/// Returns true if a title folder announces a boxed set
pub fn is_multi_book_collection(title: &str) -> bool {
    analyze_title(title, "").contains(&Issue::MultiBookCollection)
}

/// Returns true if an author folder name is a tooling or staging folder
pub fn is_system_folder(name: &str) -> bool {
    patterns::SYSTEM_FOLDERS.contains(&name.trim().to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pair_has_no_issues() {
        assert!(detect_issues("Brandon Sanderson", "The Well of Ascension").is_empty());
        assert!(detect_issues("J.R.R. Tolkien", "The Hobbit").is_empty());
        assert!(detect_issues("Steven Boyett", "The Hollow Man").is_empty());
    }

    #[test]
    fn test_system_folder_short_circuits() {
        assert_eq!(analyze_author("metadata"), vec![Issue::SystemFolderNotAuthor]);
        assert_eq!(analyze_author("Backups"), vec![Issue::SystemFolderNotAuthor]);
        assert!(is_system_folder("tmp"));
    }

    #[test]
    fn test_author_year_and_junk() {
        let issues = analyze_author("Stephen King 1986 [mp3]");
        assert!(issues.contains(&Issue::YearInAuthor));
        assert!(issues.contains(&Issue::FormatJunkInAuthor));
        assert!(issues.contains(&Issue::NotANamePattern));
    }

    #[test]
    fn test_title_fragment_as_author() {
        let issues = analyze_author("Last Chances");
        assert!(issues.contains(&Issue::TitleFragmentNotName));
        assert!(issues.contains(&Issue::TitleWordsInAuthor));
    }

    #[test]
    fn test_numeric_authors() {
        assert!(analyze_author("1984").contains(&Issue::AuthorIsNumber));
        assert!(analyze_author("12 Rules for Life").contains(&Issue::AuthorStartsWithNumber));
        assert!(analyze_author("Dune Book 2").contains(&Issue::AuthorContainsBookNumber));
    }

    #[test]
    fn test_narrator_in_author() {
        let issues = analyze_author("Stephen King - Frank Muller");
        assert!(issues.contains(&Issue::NarratorInAuthor));
    }

    #[test]
    fn test_multi_book_collection_short_circuits() {
        assert_eq!(
            analyze_title("Harry Potter Complete Series 128k", "J.K. Rowling"),
            vec![Issue::MultiBookCollection]
        );
        assert!(is_multi_book_collection("The Expanse Books 1-9"));
        assert!(is_multi_book_collection("Wheel of Time 14-Book Set"));
        assert!(!is_multi_book_collection("The Book Thief"));
    }

    #[test]
    fn test_title_issues() {
        let issues = analyze_title("The Shining by Stephen King (1977) 64kbps", "Stephen King");
        assert!(issues.contains(&Issue::AuthorInTitle));
        assert!(issues.contains(&Issue::ByAuthorInTitle));
        assert!(issues.contains(&Issue::YearInTitle));
        assert!(issues.contains(&Issue::QualityInfoInTitle));

        assert!(analyze_title("Dune (Vance)", "Frank Herbert").contains(&Issue::NarratorInTitle));
        assert!(analyze_title("Dune 21.14.07", "Frank Herbert").contains(&Issue::DurationInTitle));
        assert!(analyze_title("Dune [123456]", "Frank Herbert").contains(&Issue::CatalogIdInTitle));
        assert!(analyze_title("Mistborn Book 1 - The Final Empire", "Brandon Sanderson")
            .contains(&Issue::SeriesPrefixFormat));
        assert!(analyze_title("Steven Boyett", "Hollow").contains(&Issue::TitleLooksLikeAuthor));
    }

    #[test]
    fn test_detect_issues_adds_junk() {
        let issues = detect_issues("Brandon Sanderson", "Mistborn [rarbg]");
        assert_eq!(issues, vec![Issue::Junk("rarbg".to_string())]);
    }

    #[test]
    fn test_priority_is_capped() {
        let report = IssueReport::new((0..14).map(Issue::DiscFolders));
        assert_eq!(report.priority(), 10);
    }

    #[test]
    fn test_reason_truncates_after_three() {
        let report = IssueReport::new(vec![
            Issue::YearInAuthor,
            Issue::NotANamePattern,
            Issue::YearInTitle,
            Issue::QualityInfoInTitle,
            Issue::DurationInTitle,
        ]);
        assert_eq!(
            report.reason(),
            "year_in_author; not_a_name_pattern; year_in_title (+2 more)"
        );
        assert_eq!(report.priority(), 5);
    }

    #[test]
    fn test_report_drops_markers_and_duplicates() {
        let report = IssueReport::new(vec![
            Issue::DbLookupFailed,
            Issue::YearInTitle,
            Issue::YearInTitle,
        ]);
        assert_eq!(report.issues, vec![Issue::YearInTitle]);
    }
}
