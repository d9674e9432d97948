// crates/resilience/src/rate_limiter.rs
//! Minimum-interval rate limiting for a single external source

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum delay between consecutive calls to one source
///
/// Clones share state, so every request path that talks to the same
/// provider must hold a clone of the same limiter. The lock is held while
/// waiting and while the call runs, which serializes calls per source.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: Arc<str>,
    min_delay: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter for the named source
    pub fn new(name: impl Into<String>, min_delay: Duration) -> Self {
        Self {
            name: Arc::from(name.into()),
            min_delay,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Gets the source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the minimum delay between calls
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until a call is allowed, then records it
    ///
    /// Returns how long the caller was made to wait.
    pub async fn acquire(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;
        let waited = self.wait_for_slot(*last_call).await;
        *last_call = Some(Instant::now());
        waited
    }

    /// Runs `operation` once the minimum delay has passed
    ///
    /// No other call through this limiter can start until `operation`
    /// has finished.
    pub async fn throttle<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_call = self.last_call.lock().await;
        self.wait_for_slot(*last_call).await;
        *last_call = Some(Instant::now());
        operation().await
    }

    async fn wait_for_slot(&self, last_call: Option<Instant>) -> Duration {
        let Some(last) = last_call else {
            return Duration::ZERO;
        };

        let elapsed = last.elapsed();
        if elapsed >= self.min_delay {
            return Duration::ZERO;
        }

        let wait = self.min_delay - elapsed;
        log::debug!("Rate limiting {}: waiting {:.1}s", self.name, wait.as_secs_f64());
        tokio::time::sleep(wait).await;
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let limiter = RateLimiter::new("audnexus", Duration::from_millis(200));
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_second_call_waits_for_min_delay() {
        let limiter = RateLimiter::new("audnexus", Duration::from_millis(60));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let limiter = RateLimiter::new("openlibrary", Duration::from_millis(60));
        let other = limiter.clone();
        let start = Instant::now();
        limiter.acquire().await;
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_throttle_serializes_concurrent_calls() {
        let limiter = RateLimiter::new("googlebooks", Duration::from_millis(50));
        let a = limiter.clone();
        let b = limiter.clone();
        let start = Instant::now();

        let (x, y) = tokio::join!(
            a.throttle(|| async { 1 }),
            b.throttle(|| async { 2 })
        );

        assert_eq!(x + y, 3);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_limiter_config() {
        let limiter = RateLimiter::new("hardcover", Duration::from_millis(2500));
        assert_eq!(limiter.name(), "hardcover");
        assert_eq!(limiter.min_delay(), Duration::from_millis(2500));
    }
}
