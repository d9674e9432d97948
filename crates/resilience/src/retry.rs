// crates/resilience/src/retry.rs
//! Bounded retry with exponential or server-hinted backoff

use std::future::Future;
use std::time::Duration;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and return the error
    Stop,
    /// Retry after the policy's computed delay
    Retry,
    /// Retry after the delay the server asked for
    RetryAfter(Duration),
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first attempt)
    max_attempts: usize,
    /// Initial delay between retries
    initial_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
    /// Backoff multiplier
    multiplier: f64,
    /// Added on top of a server-supplied delay
    hint_padding: Duration,
    /// Grow delays by `initial_delay` per attempt instead of geometrically
    linear: bool,
}

impl RetryPolicy {
    /// Creates a new retry policy
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            hint_padding: Duration::ZERO,
            linear: false,
        }
    }

    /// Sets the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the margin added to server-supplied delays
    pub fn with_hint_padding(mut self, padding: Duration) -> Self {
        self.hint_padding = padding;
        self
    }

    /// Uses `initial_delay * attempt` instead of exponential growth
    pub fn with_linear_backoff(mut self) -> Self {
        self.linear = true;
        self
    }

    /// Calculates the delay before attempt number `attempt` (1-based retries)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let factor = if self.linear {
            attempt as f64
        } else {
            self.multiplier.powi((attempt - 1) as i32)
        };
        let base_delay = self.initial_delay.as_millis() as f64 * factor;

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_delay as u64)
    }

    /// Delay to use for a retry given an optional server hint
    ///
    /// Server hints are honoured as given (plus padding) and are not capped.
    pub fn delay_with_hint(&self, attempt: usize, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint + self.hint_padding,
            None => self.delay_for_attempt(attempt),
        }
    }

    /// Returns the maximum number of attempts
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Runs `operation` until it succeeds, `decide` says stop, or attempts run out
///
/// The last error is returned unchanged so callers keep their own error type.
pub async fn retry_async<F, Fut, T, E, D>(
    policy: &RetryPolicy,
    mut operation: F,
    decide: D,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    D: Fn(&E) -> RetryDecision,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let hint = match decide(&error) {
            RetryDecision::Stop => return Err(error),
            RetryDecision::Retry => None,
            RetryDecision::RetryAfter(delay) => Some(delay),
        };

        if attempt >= policy.max_attempts() {
            log::warn!("Giving up after {} attempts: {}", attempt, error);
            return Err(error);
        }

        let delay = policy.delay_with_hint(attempt, hint);
        log::info!(
            "Attempt {}/{} failed ({}), retrying in {:.1}s",
            attempt,
            policy.max_attempts(),
            error,
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(4)
            .with_initial_delay(Duration::from_millis(100))
            .with_multiplier(2.0);

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(0));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(4)
            .with_initial_delay(Duration::from_secs(45))
            .with_max_delay(Duration::from_secs(600))
            .with_linear_backoff();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(45));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(135));
    }

    #[test]
    fn test_max_delay_capping() {
        let policy = RetryPolicy::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));

        assert!(policy.delay_for_attempt(10) <= Duration::from_secs(5));
    }

    #[test]
    fn test_server_hint_wins_and_gets_padding() {
        let policy = RetryPolicy::new(3)
            .with_initial_delay(Duration::from_secs(45))
            .with_hint_padding(Duration::from_secs(5));

        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(12))),
            Duration::from_secs(17)
        );
        assert_eq!(policy.delay_with_hint(1, None), Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(1));
        let calls = AtomicUsize::new(0);

        let result: Result<i32, String> = retry_async(
            &policy,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("HTTP 429".to_string())
                    } else {
                        Ok(42)
                    }
                }
            },
            |_| RetryDecision::Retry,
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stop_decision_returns_immediately() {
        let policy = RetryPolicy::new(5).with_initial_delay(Duration::from_millis(1));
        let calls = AtomicUsize::new(0);

        let result: Result<(), String> = retry_async(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("HTTP 401".to_string()) }
            },
            |_| RetryDecision::Stop,
        )
        .await;

        assert_eq!(result, Err("HTTP 401".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(1));
        let calls = AtomicUsize::new(0);

        let result: Result<(), String> = retry_async(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("busy".to_string()) }
            },
            |_| RetryDecision::RetryAfter(Duration::from_millis(1)),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
