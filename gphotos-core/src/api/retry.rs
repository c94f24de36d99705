//! Bounded fixed-delay retry policy built on the `backoff` crate

use super::error::{PhotosError, Result};
use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempt count and fixed delay between attempts.
///
/// `max_attempts` counts the first try, so a policy of 3 issues at most three
/// requests and sleeps twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Same attempt budget, no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let backoff = FixedAttempts::new(self);
        let mut attempt = 0u32;

        retry_notify(
            backoff,
            || {
                attempt += 1;
                let current = attempt;
                let fut = operation();
                async move {
                    fut.await.map_err(|error| {
                        if error.is_retryable() {
                            backoff::Error::transient(error)
                        } else {
                            debug!(attempt = current, "Non-retryable error: {}", error);
                            backoff::Error::permanent(error)
                        }
                    })
                }
            },
            |error: PhotosError, wait: Duration| {
                warn!(
                    operation = what,
                    retry_in_ms = wait.as_millis() as u64,
                    "Attempt failed, retrying: {}",
                    error
                );
            },
        )
        .await
    }
}

/// Yields `max_attempts - 1` fixed delays, then gives up
struct FixedAttempts {
    delay: Duration,
    retries: u32,
    remaining: u32,
}

impl FixedAttempts {
    fn new(policy: &RetryPolicy) -> Self {
        let retries = policy.max_attempts.saturating_sub(1);
        Self {
            delay: policy.delay,
            retries,
            remaining: retries,
        }
    }
}

impl Backoff for FixedAttempts {
    fn reset(&mut self) {
        self.remaining = self.retries;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            None
        } else {
            self.remaining -= 1;
            Some(self.delay)
        }
    }
}
