// FILE: crates/llm/src/response.rs
//! Tolerant parsing of model output
//!
//! Models wrap JSON in code fences, return numbers as strings and the other
//! way round, and sometimes write "null" as text. All of that is accepted;
//! anything that is not JSON of the expected shape is `Malformed`.

use crate::{Confidence, Decision, LlmError, LlmResult, ParsedName, Verification};
use serde_json::Value;

/// Removes a surrounding ``` or ```json fence
pub fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn parse_json(text: &str) -> LlmResult<Value> {
    serde_json::from_str(strip_fences(text)).map_err(|e| LlmError::Malformed(e.to_string()))
}

/// Text of a field, with null-like strings read as absent
fn text_field(object: &Value, key: &str) -> Option<String> {
    let value = match object.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        _ => return None,
    };

    match value.to_ascii_lowercase().as_str() {
        "" | "null" | "none" | "n/a" => None,
        _ => Some(value),
    }
}

/// Integers print without a fraction, so `2.0` and `2` agree
fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn year_field(object: &Value) -> Option<i32> {
    text_field(object, "year").and_then(|y| y.get(..4).and_then(|y| y.parse().ok()))
}

/// `ITEM_3`, `item 3`, `3` and the number 3 all map to index 2
fn item_index(object: &Value) -> Option<usize> {
    let label = text_field(object, "item")?;
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<usize>().ok()?.checked_sub(1)
}

fn parsed_name(object: &Value) -> ParsedName {
    ParsedName {
        author: text_field(object, "author").unwrap_or_default(),
        title: text_field(object, "title").unwrap_or_default(),
        narrator: text_field(object, "narrator"),
        series: text_field(object, "series"),
        series_num: text_field(object, "series_num"),
        year: year_field(object),
    }
}

/// Parses a batch answer into one slot per input item
///
/// Objects are placed by their `item` label, falling back to their position.
/// Slots the model skipped stay `None`.
pub fn parse_names(text: &str, expected: usize) -> LlmResult<Vec<Option<ParsedName>>> {
    let objects = match parse_json(text)? {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(LlmError::Malformed(format!(
                "expected a JSON array, got {}",
                other
            )))
        }
    };

    let mut slots: Vec<Option<ParsedName>> = vec![None; expected];
    for (position, object) in objects.iter().enumerate() {
        if !object.is_object() {
            continue;
        }
        let index = item_index(object)
            .filter(|i| *i < expected)
            .unwrap_or(position);
        if let Some(slot) = slots.get_mut(index) {
            if slot.is_none() {
                *slot = Some(parsed_name(object));
            }
        }
    }

    Ok(slots)
}

/// Parses a verification answer
///
/// Missing recommendations fall back to the original author and title;
/// a missing decision is `UNCERTAIN` and a missing confidence `LOW`.
pub fn parse_verification(
    text: &str,
    original_author: &str,
    original_title: &str,
) -> LlmResult<Verification> {
    let object = parse_json(text)?;
    if !object.is_object() {
        return Err(LlmError::Malformed("expected a JSON object".to_string()));
    }

    Ok(Verification {
        decision: Decision::parse(&text_field(&object, "decision").unwrap_or_default()),
        recommended_author: text_field(&object, "recommended_author")
            .unwrap_or_else(|| original_author.to_string()),
        recommended_title: text_field(&object, "recommended_title")
            .unwrap_or_else(|| original_title.to_string()),
        reasoning: text_field(&object, "reasoning").unwrap_or_default(),
        confidence: Confidence::parse(&text_field(&object, "confidence").unwrap_or_default()),
    })
}
