// crates/network/src/error.rs
//! Error types for network operations

use std::time::Duration;
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Transport-level failure (connect, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        /// Response body, kept for servers that explain throttling in it
        body: String,
        /// Parsed `Retry-After` header, if any
        retry_after: Option<Duration>,
    },

    /// The body was not the JSON shape the caller asked for
    #[error("Could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl NetworkError {
    /// Returns true if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Timeout => true,
            NetworkError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            NetworkError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the HTTP status if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Status { status, .. } => Some(*status),
            NetworkError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for HTTP 429
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Returns true if the error is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// Returns true if the error is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// Response body of a status error
    pub fn body(&self) -> Option<&str> {
        match self {
            NetworkError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> NetworkError {
        NetworkError::Status {
            status: code,
            url: "https://example.invalid/x".to_string(),
            body: "slow down".to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn test_error_display() {
        let err = NetworkError::InvalidUrl("test".to_string());
        assert!(err.to_string().contains("Invalid URL"));
        assert_eq!(status(404).to_string(), "HTTP 404 from https://example.invalid/x");
    }

    #[test]
    fn test_status_classification() {
        assert!(status(429).is_rate_limited());
        assert!(status(429).is_client_error());
        assert!(!status(429).is_retryable());
        assert!(status(503).is_server_error());
        assert!(status(503).is_retryable());
        assert_eq!(status(429).body(), Some("slow down"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(NetworkError::Timeout.is_retryable());
        assert!(!NetworkError::InvalidUrl("test".to_string()).is_retryable());
        assert!(!NetworkError::Decode {
            url: "u".to_string(),
            message: "m".to_string()
        }
        .is_retryable());
    }
}
