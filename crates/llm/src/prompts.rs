// FILE: crates/llm/src/prompts.rs
//! Prompt construction for batch parsing and change verification

use shelfwise_core::Candidate;
use std::fmt::Write;

/// One folder name to parse, with optional advisory context
#[derive(Debug, Clone, Default)]
pub struct PromptItem {
    /// `author - title` as currently found on disk
    pub name: String,
    /// Best metadata source hit, shown as a hint only
    pub api_hint: Option<Candidate>,
    /// Metadata read from files inside the folder, already formatted
    pub folder_hints: Option<String>,
}

impl PromptItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Everything the verifier needs to judge a drastic author change
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub original_input: String,
    pub original_author: String,
    pub original_title: String,
    pub proposed_author: String,
    pub proposed_title: String,
    pub candidates: Vec<Candidate>,
}

const PARSE_RULES: &str = r#"TRUST THE EXISTING AUTHOR:
- If the input already reads "Author - Title" or "Author / Title" with a human name as the author, keep that author.
- Different authors often publish books with the same title. An API hit with another author for the same title does not make the input wrong.
- Change the author only when it is clearly not a person ("Unknown", "Various", a series name), when author and title are swapped, or when it is gibberish.

API HINTS ARE ADVISORY:
- Hints can be unrelated books that share a single word ("Chapter 19" is not "College Accounting, Chapters 1-9").
- Ignore a hint whose title is clearly a different book.
- Only rely on a hint when the input has no author or the titles closely match.

NAMES:
- Use Latin characters for author and title, transliterating if needed.
- Fix obvious typos in author names.
- Remove release junk: tracker tags, bitrates, file sizes, version numbers, format tags.
- Never put "Book N" in the title; that belongs in series_num.

NARRATORS:
- A trailing parenthesised single surname such as "(Kafer)" or "(Vance)" is the narrator.
- Genres, formats, years, bitrates and sources in parentheses are junk, not narrators.
- When unsure, narrator is null.

SERIES:
- Set series and series_num only when certain the book belongs to a series.
- The title is the book's own title, never "Series Book N".
- Standalone books have series and series_num null."#;

const PARSE_FORMAT: &str = r#"Return a JSON array. Each object MUST carry the "item" label of its input:
[
  {"item": "ITEM_1", "author": "Author Name", "title": "Book Title", "narrator": null, "series": null, "series_num": null, "year": null}
]

Return ONLY the JSON array."#;

/// Builds the batch parse prompt
///
/// Items are numbered from 1 as `ITEM_n`; the response is matched back by
/// that label.
pub fn build_parse_prompt(items: &[PromptItem]) -> String {
    let mut list = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = write!(list, "ITEM_{}: {}", i + 1, item.name);
        if let Some(hit) = &item.api_hint {
            let _ = write!(
                list,
                "\n  -> API found: {} - {} (from {})",
                hit.author, hit.title, hit.source
            );
        }
        if let Some(hints) = &item.folder_hints {
            let _ = write!(list, "\n  -> Folder metadata: {}", hints);
        }
        list.push('\n');
    }

    format!(
        "You are a book metadata expert. For each folder name, identify the real author and title.\n\n{}\n{}\n\n{}",
        list, PARSE_RULES, PARSE_FORMAT
    )
}

const VERIFY_RULES: &str = r#"REJECT UNRELATED MATCHES:
Search results sometimes return a different book that shares one word with the original. Those are always wrong.
If the proposed title shares less than half of its significant words with the original title, the change is WRONG.

DECIDE:
1. Is this the same book? Compare titles first.
2. Does the original author match or extend a candidate author? "Boyett" matches "Steven Boyett"; it does not match "John Dickson Carr".
3. Keep a real author name from the input unless it is clearly wrong.
4. Prefer the candidate whose author matches or extends the original.

RESPOND WITH JSON ONLY:
{
  "decision": "CORRECT" or "WRONG" or "UNCERTAIN",
  "recommended_author": "The correct author name",
  "recommended_title": "The correct title",
  "reasoning": "Brief explanation",
  "confidence": "HIGH" or "MEDIUM" or "LOW"
}

When in doubt, answer WRONG. Leaving a book unfixed is better than renaming it to the wrong thing."#;

/// Builds the verification prompt listing every gathered candidate
pub fn build_verification_prompt(request: &VerificationRequest) -> String {
    let mut candidates = String::new();
    for (i, c) in request.candidates.iter().enumerate() {
        let _ = writeln!(
            candidates,
            "  CANDIDATE_{}: {} - {} (from {})",
            i + 1,
            c.author,
            c.title,
            c.source
        );
    }
    if candidates.is_empty() {
        candidates.push_str("  No API results found.\n");
    }

    format!(
        "You are a book metadata verification expert. A drastic author change was detected and needs your verification.\n\n\
         ORIGINAL INPUT: {}\n  - Current Author: {}\n  - Current Title: {}\n\n\
         PROPOSED CHANGE:\n  - New Author: {}\n  - New Title: {}\n\n\
         ALL API SEARCH RESULTS:\n{}\n{}",
        request.original_input,
        request.original_author,
        request.original_title,
        request.proposed_author,
        request.proposed_title,
        candidates,
        VERIFY_RULES
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_numbers_items_and_hints() {
        let items = vec![
            PromptItem::new("Boyett - The Hollow Man"),
            PromptItem {
                name: "Unknown - Leviathan Wakes".to_string(),
                api_hint: Some(Candidate::new(
                    "James S.A. Corey",
                    "Leviathan Wakes",
                    "audnexus",
                )),
                folder_hints: Some("narrator=Jefferson Mays".to_string()),
            },
        ];

        let prompt = build_parse_prompt(&items);
        assert!(prompt.contains("ITEM_1: Boyett - The Hollow Man\n"));
        assert!(prompt.contains("ITEM_2: Unknown - Leviathan Wakes"));
        assert!(prompt.contains("-> API found: James S.A. Corey - Leviathan Wakes (from audnexus)"));
        assert!(prompt.contains("-> Folder metadata: narrator=Jefferson Mays"));
        assert!(!prompt.contains("ITEM_3"));
    }

    #[test]
    fn test_verification_prompt_lists_candidates() {
        let request = VerificationRequest {
            original_input: "Boyett/The Hollow Man".to_string(),
            original_author: "Boyett".to_string(),
            original_title: "The Hollow Man".to_string(),
            proposed_author: "John Dickson Carr".to_string(),
            proposed_title: "The Hollow Man".to_string(),
            candidates: vec![
                Candidate::new("Steven Boyett", "The Hollow Man", "openlibrary"),
                Candidate::new("John Dickson Carr", "The Hollow Man", "googlebooks"),
            ],
        };

        let prompt = build_verification_prompt(&request);
        assert!(prompt.contains("CANDIDATE_1: Steven Boyett - The Hollow Man (from openlibrary)"));
        assert!(prompt.contains("CANDIDATE_2: John Dickson Carr"));
        assert!(prompt.contains("New Author: John Dickson Carr"));
        assert!(!prompt.contains("No API results found"));
    }

    #[test]
    fn test_verification_prompt_without_candidates() {
        let request = VerificationRequest {
            original_input: "X/Y".to_string(),
            original_author: "X".to_string(),
            original_title: "Y".to_string(),
            proposed_author: "Z".to_string(),
            proposed_title: "Y".to_string(),
            candidates: Vec::new(),
        };
        assert!(build_verification_prompt(&request).contains("No API results found."));
    }
}
