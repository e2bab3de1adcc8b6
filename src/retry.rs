//! Fixed-delay retry for calls to remote services.
//!
//! A [`RetryPolicy`] is applied at the call site around any async operation
//! returning [`crate::error::Result`]:
//!
//! ```ignore
//! let feed = policy.run("fetch", || client.get_feed(&query)).await?;
//! ```
//!
//! # Strategy
//!
//! - The call is attempted at most `max_attempts` times
//! - Between attempts the task sleeps for a constant `delay`
//! - Only errors accepted by the `retryable` predicate are retried; anything
//!   else is returned immediately

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::{Error, Result};

/// How often and how patiently to retry a remote call.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Constant pause between attempts.
    pub delay: Duration,
    /// Decides whether a failure is worth another attempt.
    pub retryable: fn(&Error) -> bool,
}

impl RetryPolicy {
    /// Policy retrying transient errors only.
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            retryable: Error::is_transient,
        }
    }

    /// Index fetches: 10 attempts, 30 s apart.
    pub fn patient_fetch() -> Self {
        Self::fixed(10, Duration::from_secs(30))
    }

    /// Index fetches, older setting: 5 attempts, 60 s apart.
    pub fn legacy_fetch() -> Self {
        Self::fixed(5, Duration::from_secs(60))
    }

    /// Webhook deliveries: 5 attempts, 60 s apart.
    pub fn notify() -> Self {
        Self::fixed(5, Duration::from_secs(60))
    }

    /// Run `call` until it succeeds, fails permanently, or runs out of attempts.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total_t0 = Instant::now();
        let max = self.max_attempts.max(1);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !(self.retryable)(&err) {
                error!(operation, attempt, error = %err, "non-retryable failure");
                return Err(err);
            }

            if attempt >= max {
                error!(
                    operation,
                    attempt,
                    max,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    error = %err,
                    "retries exhausted"
                );
                return Err(err);
            }

            warn!(
                operation,
                attempt,
                max,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                delay = ?self.delay,
                error = %err,
                "attempt failed; retrying after fixed delay"
            );
            sleep(self.delay).await;
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}
