// crates/resilience/src/error.rs
//! Error types for resilience operations

use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur in resilience operations
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts exhausted: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    /// Request budget for the current window is spent
    #[error("Rate limit exceeded (limit: {limit} per {window:?})")]
    RateLimitExceeded {
        limit: usize,
        window: std::time::Duration,
    },

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_error() {
        let err = ResilienceError::RetriesExhausted {
            attempts: 3,
            last_error: "HTTP 429".to_string(),
        };
        assert!(err.to_string().contains("3"));
        assert!(err.to_string().contains("HTTP 429"));
    }

    #[test]
    fn test_rate_limit_error() {
        let err = ResilienceError::RateLimitExceeded {
            limit: 30,
            window: std::time::Duration::from_secs(3600),
        };
        assert!(err.to_string().contains("Rate limit"));
        assert!(err.to_string().contains("30"));
    }
}
