//! Bounded retry for transactional work.
//!
//! A transaction that loses a race against a concurrent writer is rolled back and
//! reported as [`Error::WriteConflict`]. [`with_retry`] reruns the whole unit of work
//! in a fresh transaction until it commits, fails for a real reason, or the attempt
//! budget runs out.

use crate::errors::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to run a transactional operation and how long to pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause before attempt `n + 1` is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy, clamping `max_attempts` to at least one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(25))
    }
}

/// Runs `op` until it succeeds or fails with a non-transient error.
///
/// Transient failures are retried up to `policy.max_attempts` times in total. When
/// every attempt conflicted the result is [`Error::ConcurrencyConflict`].
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_transient() => {
                if attempt >= policy.max_attempts {
                    warn!(attempts = attempt, "Giving up after repeated write conflicts");
                    return Err(Error::ConcurrencyConflict { attempts: attempt });
                }
                warn!(attempt, error = %err, "Write conflict, retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
