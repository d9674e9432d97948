// crates/resilience/src/lib.rs
//! Resilience patterns for talking to external services
//!
//! This module provides:
//! - Per-source minimum-interval rate limiting
//! - A rolling hourly request budget
//! - Bounded retry with server-hinted or exponential backoff
//!
//! # Example
//!
//! ```rust
//! use shelfwise_resilience::{RateLimiter, RetryPolicy};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new("openlibrary", Duration::from_millis(1500));
//! let policy = RetryPolicy::new(4)
//!     .with_initial_delay(Duration::from_secs(45))
//!     .with_hint_padding(Duration::from_secs(5));
//! assert_eq!(limiter.name(), "openlibrary");
//! assert_eq!(policy.max_attempts(), 4);
//! ```

mod budget;
mod error;
mod rate_limiter;
mod retry;

pub use budget::RequestBudget;
pub use error::{ResilienceError, ResilienceResult};
pub use rate_limiter::RateLimiter;
pub use retry::{retry_async, RetryDecision, RetryPolicy};
