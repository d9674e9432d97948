//! External metadata hits

use serde::{Deserialize, Serialize};

/// One hit returned by a metadata source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub series: Option<String>,
    pub series_num: Option<String>,
    pub narrator: Option<String>,
    pub variant: Option<String>,
    pub edition: Option<String>,
    /// Name of the source that produced the hit
    pub source: String,
    /// Source-specific confidence in 0.0..=1.0
    pub confidence: f64,
}

impl Candidate {
    /// Creates a candidate with the required fields
    pub fn new(
        author: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            source: source.into(),
            confidence: 1.0,
            ..Default::default()
        }
    }

    /// Sets the publication year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets the series name and optional position
    pub fn with_series(mut self, series: impl Into<String>, num: Option<String>) -> Self {
        self.series = Some(series.into());
        self.series_num = num;
        self
    }

    /// Sets the narrator
    pub fn with_narrator(mut self, narrator: impl Into<String>) -> Self {
        self.narrator = Some(narrator.into());
        self
    }

    /// Sets the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Case-insensitive identity used to merge hits from several sources
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            self.author.trim().to_lowercase(),
            self.title.trim().to_lowercase()
        )
    }

    /// A hit is only useful with both an author and a title
    pub fn is_complete(&self) -> bool {
        !self.author.trim().is_empty() && !self.title.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_ignores_case_and_padding() {
        let a = Candidate::new("Brandon Sanderson", "Mistborn", "audnexus");
        let b = Candidate::new(" brandon sanderson", "MISTBORN ", "openlibrary");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_incomplete_candidate() {
        assert!(!Candidate::new("", "Mistborn", "x").is_complete());
        assert!(Candidate::new("A B", "T", "x").is_complete());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let c = Candidate::new("a", "b", "c").with_confidence(3.0);
        assert_eq!(c.confidence, 1.0);
    }
}
