//! Lexical rules shared by the classifier, the issue detector and the scanner

use once_cell::sync::Lazy;
use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static DISC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(disc|disk|cd|part|chapter|ch|side)\s*\d+",
        r"(?i)^\d+\s*[-_]\s*(disc|disk|cd|part|chapter)",
        r"(?i)^side\s*[ab12]\b",
        r"(?i).+\s*-\s*(disc|disk|cd)\s*\d+$",
        r"^\d{1,2}$",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[A-Z][a-z]+\s+[A-Z][a-z]+$",
        r"^[A-Z][a-z]+\s+[A-Z][a-z]+\s+[A-Z][a-z]+$",
        r"^[A-Z]\.\s*[A-Z][a-z]+$",
        r"^[A-Z][a-z]+\s+[A-Z]\.\s*[A-Z][a-z]+$",
        r"^[A-Z][a-z]+,\s+[A-Z][a-z]+$",
        r"^[A-Z][a-z]+$",
        r"^[A-Z]\.([A-Z]\.)+\s*[A-Z][a-z]+$",
        r"^[A-Z][a-z]+\s+[A-Z]\.([A-Z]\.)+\s*[A-Z][a-z]+$",
        r"^[A-Z][a-z]+\s+[A-Z]\.\s*(Le|De|Von|Van|La|Du)\s+[A-Z][a-z]+$",
        r"^[A-Z][a-z]+\s+(Le|De|Von|Van|La|Du)\s+[A-Z][a-z]+$",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});

static JUNK_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("bitsearch", r"(?i)\[bitsearch\.to\]"),
        ("rarbg", r"(?i)\[rarbg\]"),
        ("unabridged", r"(?i)\(unabridged\)"),
        ("abridged", r"(?i)\(abridged\)"),
        ("audiobook", r"(?i)\(audiobook\)"),
        ("audio", r"(?i)\(audio\)"),
        ("graphicaudio", r"(?i)\(graphicaudio\)"),
        ("uk_version", r"(?i)\(uk version\)"),
        ("us_version", r"(?i)\(us version\)"),
        ("language_tag", r"(?i)\[EN\]"),
        ("release_version", r"(?i)\(r\d+\.\d+\)"),
        ("numeric_tag", r"\[\d+\]"),
        ("size_mb", r"(?i)\{\d+mb\}"),
        ("size_gb", r"(?i)\{\d+\.\d+gb\}"),
        ("bitrate_duration", r"(?i)\d+k\s+\d+\.\d+\.\d+"),
        ("bitrate", r"(?i)\b(128k|64k|192k|320k)\b"),
        ("ebook_extension", r"(?i)\.(epub|pdf|mobi)$"),
    ]
    .iter()
    .map(|(name, p)| (*name, compile(p)))
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));
static BOOK_NUMBER_SEGMENT: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^(?:(?:book|vol(?:ume)?\.?|no\.?)\s*\d+|#\d+)$"));
static BOOK_NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\b(?:book|vol(?:ume)?|part)\s*\d+"));
static SERIES_WORD: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(series|saga|cycle|chronicles|trilogy|quartet|sequence|universe)\b")
});
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| compile(r"\b(19|20)\d{2}\b"));

static NUMBERED_BOOK_FOLDER: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d+\s*[-–—:.]?\s*\w",
        r"^#?\d+\s*[-–—:]",
        r"(?i)book\s*\d+",
        r"(?i)vol(ume)?\s*\d+",
        r"(?i)part\s*\d+",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});

static BOOK_NUMBER_IN_FILE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)book\s*(\d+)",
        r"#(\d+)",
        r"(?i)vol(?:ume)?\.?\s*(\d+)",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});

/// Adjectives and articles that open titles, not first names
pub const NOT_FIRST_NAMES: &[&str] = &[
    "last", "first", "final", "dark", "shadow", "night", "blood", "death", "city", "house",
    "world", "kingdom", "empire", "war", "game", "fire", "ice", "storm", "the", "a", "an", "of",
    "and", "in", "to", "for", "new", "old", "black", "white", "red", "blue", "green", "golden",
    "lost", "forgotten", "hidden", "secret", "ancient", "eternal",
];

/// Plural nouns that end titles, not surnames
pub const NOT_SURNAMES: &[&str] = &[
    "chances", "secrets", "lies", "dreams", "tales", "chronicles", "stories", "wishes",
    "memories", "shadows", "nights", "days", "years", "wars", "games", "fires", "storms",
    "kingdoms", "empires", "worlds", "houses", "cities", "deaths", "lives", "loves", "hearts",
    "souls", "minds", "stars", "moons", "suns", "gods", "demons", "angels", "dragons", "kings",
    "queens", "lords", "princes", "witches", "wizards",
];

/// Words that give a folder name away as a title
pub const TITLE_WORDS: &[&str] = &[
    "the", "of", "and", "a", "in", "to", "for", "book", "series", "volume", "last", "first",
    "final", "dark", "shadow", "night", "blood", "death", "city", "house", "world", "kingdom",
    "empire", "war", "game", "fire", "ice", "storm", "king", "queen", "lord", "lady", "prince",
    "dragon", "chances", "secrets", "lies", "dreams", "tales", "chronicles",
];

/// Folder names that hold tooling output or staging data, never an author
pub const SYSTEM_FOLDERS: &[&str] = &[
    "metadata", "tmp", "temp", "cache", "config", "data", "logs", "log", "backup", "backups",
    "old", "new", "test", "tests", "sample", "samples", ".thumbnails", "thumbnails", "covers",
    "images", "artwork", "art", "extras", "bonus", "misc", "other", "various", "unknown",
    "unsorted", "downloads", "incoming", "processing", "completed", "done", "failed", "streams",
    "chapters", "parts", "disc", "disk", "cd", "dvd",
];

const TITLE_STOPWORDS: &[&str] = &["the", "of", "and", "a", "an", "in", "to", "for"];

/// Returns true for disc, part, chapter and side folders
pub fn is_disc_folder(name: &str) -> bool {
    let name = name.trim();
    DISC_PATTERNS.iter().any(|p| p.is_match(name))
}

/// Returns true if `name` matches one of the person-name shapes
pub fn matches_name_shape(name: &str) -> bool {
    let name = name.trim();
    NAME_PATTERNS.iter().any(|p| p.is_match(name))
}

/// Stricter person-name test used to assign roles
///
/// The shape must match and neither the opening word nor the closing word
/// may be a typical title word.
pub fn looks_like_person_name(name: &str) -> bool {
    if !matches_name_shape(name) {
        return false;
    }

    let words = lowercase_words(name);
    if words.len() < 2 {
        return true;
    }

    let first = words[0].trim_end_matches(',');
    let last = words[words.len() - 1].as_str();
    !NOT_FIRST_NAMES.contains(&first) && !NOT_SURNAMES.contains(&last)
}

/// "Book 3", "Vol. 2", "#4"
pub fn looks_like_book_number(name: &str) -> bool {
    BOOK_NUMBER_SEGMENT.is_match(name.trim())
}

/// Series words or a bare year
pub fn looks_like_series(name: &str) -> bool {
    SERIES_WORD.is_match(name) || BARE_YEAR.is_match(name)
}

/// Returns true if a folder name reads like a book title rather than a person
pub fn resembles_title(name: &str) -> bool {
    if BARE_YEAR.is_match(name) || BOOK_NUMBER_TOKEN.is_match(name) {
        return true;
    }
    lowercase_words(name)
        .iter()
        .any(|w| TITLE_STOPWORDS.contains(&w.as_str()))
}

/// Returns true if a subfolder name reads like one book of a series
pub fn is_numbered_book_folder(name: &str) -> bool {
    !is_disc_folder(name) && NUMBERED_BOOK_FOLDER.iter().any(|p| p.is_match(name))
}

/// Extracts an explicit book number from an audio file stem
pub fn book_number_in_file(stem: &str) -> Option<String> {
    BOOK_NUMBER_IN_FILE.iter().find_map(|p| {
        p.captures(stem)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_start_matches('0').to_string())
            .map(|n| if n.is_empty() { "0".to_string() } else { n })
    })
}

/// Strips release junk from a title
///
/// Returns the cleaned title and the names of the junk rules that fired.
pub fn clean_title(title: &str) -> (String, Vec<&'static str>) {
    let mut cleaned = title.to_string();
    let mut fired = Vec::new();

    for (name, pattern) in JUNK_PATTERNS.iter() {
        if pattern.is_match(&cleaned) {
            fired.push(*name);
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
    }

    let collapsed = WHITESPACE.replace_all(&cleaned, " ");
    let trimmed = collapsed.trim_matches(|c: char| c == '-' || c == '_' || c.is_whitespace());
    (trimmed.to_string(), fired)
}

pub(crate) fn lowercase_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_folders() {
        for name in ["CD1", "Disc 2", "disk03", "Part 1", "Chapter 12", "Side A", "01", "7"] {
            assert!(is_disc_folder(name), "{} should be a disc folder", name);
        }
        assert!(is_disc_folder("01 - Disc"));
        assert!(is_disc_folder("The Stand - CD 3"));
        assert!(!is_disc_folder("Mistborn"));
        assert!(!is_disc_folder("1984"));
        assert!(!is_disc_folder("Book 1 - The Final Empire"));
    }

    #[test]
    fn test_person_names() {
        for name in [
            "Brandon Sanderson",
            "J.R.R. Tolkien",
            "George R.R. Martin",
            "Ursula K. Le Guin",
            "H. Lovecraft",
            "Plato",
        ] {
            assert!(looks_like_person_name(name), "{} should be a name", name);
        }
        assert!(!looks_like_person_name("Last Chances"));
        assert!(!looks_like_person_name("Dark Tower"));
        assert!(!looks_like_person_name("The Hollow Man"));
        assert!(!looks_like_person_name("Mistborn Book 1"));
    }

    #[test]
    fn test_book_number_segments() {
        assert!(looks_like_book_number("Book 3"));
        assert!(looks_like_book_number("Vol. 2"));
        assert!(looks_like_book_number("#4"));
        assert!(!looks_like_book_number("Book of Dust"));
    }

    #[test]
    fn test_series_segments() {
        assert!(looks_like_series("The Stormlight Archive Series"));
        assert!(looks_like_series("Dune Chronicles"));
        assert!(looks_like_series("Collected 1999"));
        assert!(!looks_like_series("Frank Herbert"));
    }

    #[test]
    fn test_numbered_book_folders_exclude_discs() {
        assert!(is_numbered_book_folder("01 The Final Empire"));
        assert!(is_numbered_book_folder("Book 2 - The Well of Ascension"));
        assert!(is_numbered_book_folder("#3 - Hero of Ages"));
        assert!(!is_numbered_book_folder("Part 1"));
        assert!(!is_numbered_book_folder("CD2"));
    }

    #[test]
    fn test_book_number_in_file() {
        assert_eq!(
            book_number_in_file("Necroscope Book 1").as_deref(),
            Some("1")
        );
        assert_eq!(book_number_in_file("Necroscope #02").as_deref(), Some("2"));
        assert_eq!(book_number_in_file("Vol. 3 - Deadspeak").as_deref(), Some("3"));
        assert_eq!(book_number_in_file("01 - Opening Credits"), None);
    }

    #[test]
    fn test_clean_title_strips_junk() {
        let (cleaned, fired) = clean_title("The Hobbit (Unabridged) [rarbg] 128k");
        assert_eq!(cleaned, "The Hobbit");
        assert!(fired.contains(&"unabridged"));
        assert!(fired.contains(&"rarbg"));
        assert!(fired.contains(&"bitrate"));
    }

    #[test]
    fn test_clean_title_keeps_clean_titles() {
        let (cleaned, fired) = clean_title("The Hollow Man");
        assert_eq!(cleaned, "The Hollow Man");
        assert!(fired.is_empty());
    }

    #[test]
    fn test_resembles_title() {
        assert!(resembles_title("The Hollow Man"));
        assert!(resembles_title("Dune 1965"));
        assert!(resembles_title("Necroscope Book 2"));
        assert!(!resembles_title("Steven Boyett"));
    }
}
