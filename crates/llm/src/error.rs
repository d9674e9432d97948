// FILE: crates/llm/src/error.rs
//! Error types for language model calls

use shelfwise_network::NetworkError;
use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("No API key configured for {0}")]
    MissingApiKey(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl LlmError {
    /// Returns true when the provider answered HTTP 429
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::Network(e) if e.is_rate_limited())
    }
}

/// Human-readable explanation of a provider's HTTP status
pub fn explain_status(status: u16, provider: &str) -> String {
    match status {
        400 => "Bad request - the API did not understand the request".to_string(),
        401 => "Invalid API key - check the key in the config file".to_string(),
        403 => "Access denied - the API key lacks permission".to_string(),
        404 => "Model not found - the configured model may not exist".to_string(),
        429 => "Rate limit exceeded - waiting before retry".to_string(),
        500 => format!("{} server error", provider),
        502 => format!("{} is temporarily down", provider),
        503 => format!("{} is overloaded", provider),
        other => format!("Unknown error (HTTP {})", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_status() {
        assert!(explain_status(401, "Gemini").contains("Invalid API key"));
        assert_eq!(explain_status(502, "Gemini"), "Gemini is temporarily down");
        assert_eq!(explain_status(418, "Gemini"), "Unknown error (HTTP 418)");
    }

    #[test]
    fn test_rate_limited() {
        let err = LlmError::Network(NetworkError::Status {
            status: 429,
            url: "https://example.invalid".to_string(),
            body: String::new(),
            retry_after: None,
        });
        assert!(err.is_rate_limited());
        assert!(!LlmError::Malformed("x".to_string()).is_rate_limited());
    }
}
