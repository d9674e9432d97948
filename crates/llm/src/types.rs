// FILE: crates/llm/src/types.rs
//! Structured results returned by the language model

/// One parsed folder name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedName {
    pub author: String,
    pub title: String,
    pub narrator: Option<String>,
    pub series: Option<String>,
    pub series_num: Option<String>,
    pub year: Option<i32>,
}

impl ParsedName {
    /// A parse without both author and title proposes nothing
    pub fn is_empty(&self) -> bool {
        self.author.trim().is_empty() || self.title.trim().is_empty()
    }
}

/// Verifier's verdict on a proposed change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Correct,
    Wrong,
    Uncertain,
}

impl Decision {
    /// Unknown values read as `Uncertain`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CORRECT" => Decision::Correct,
            "WRONG" => Decision::Wrong,
            _ => Decision::Uncertain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Correct => "CORRECT",
            Decision::Wrong => "WRONG",
            Decision::Uncertain => "UNCERTAIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Unknown values read as `Low`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Confidence::High,
            "MEDIUM" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

/// Answer to a verification prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub decision: Decision,
    pub recommended_author: String,
    pub recommended_title: String,
    pub reasoning: String,
    pub confidence: Confidence,
}

impl Verification {
    /// CORRECT with at least medium confidence
    pub fn is_verified(&self) -> bool {
        self.decision == Decision::Correct
            && matches!(self.confidence, Confidence::High | Confidence::Medium)
    }
}
