// crates/resilience/src/budget.rs
//! Rolling request budget

use crate::error::{ResilienceError, ResilienceResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sliding-window request budget, e.g. "30 calls per hour"
#[derive(Debug, Clone)]
pub struct RequestBudget {
    max_requests: usize,
    window: Duration,
    requests: Arc<Mutex<VecDeque<Instant>>>,
}

impl RequestBudget {
    /// Creates a budget of `max_requests` per `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Creates a budget of `max_requests` per hour
    pub fn hourly(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(3600))
    }

    /// Records one request if the budget allows it
    pub fn try_acquire(&self) -> ResilienceResult<()> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| ResilienceError::Custom("Lock poisoned".to_string()))?;

        Self::evict_expired(&mut requests, self.window);

        if requests.len() < self.max_requests {
            requests.push_back(Instant::now());
            Ok(())
        } else {
            Err(ResilienceError::RateLimitExceeded {
                limit: self.max_requests,
                window: self.window,
            })
        }
    }

    /// Returns true if another request would currently be allowed
    pub fn has_capacity(&self) -> bool {
        self.used() < self.max_requests
    }

    /// Number of requests made inside the current window
    pub fn used(&self) -> usize {
        match self.requests.lock() {
            Ok(mut requests) => {
                Self::evict_expired(&mut requests, self.window);
                requests.len()
            }
            Err(_) => self.max_requests,
        }
    }

    /// Gets the maximum number of requests allowed
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Gets the time window
    pub fn window(&self) -> Duration {
        self.window
    }

    fn evict_expired(requests: &mut VecDeque<Instant>, window: Duration) {
        let now = Instant::now();
        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}
