// src/retry.rs

//! Timeout, cancellation and retry for network operations
//!
//! Each attempt runs under a per-attempt timeout and races the caller's
//! cancellation token. Transient failures ([`Error::is_transient`]) are retried
//! with linear backoff; everything else is returned immediately.

use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default per-attempt timeout for HTTP requests (30 seconds)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for a transient failure
pub const MAX_RETRIES: u32 = 3;

/// Base retry delay in milliseconds; attempt `n` waits `n` times this
pub const RETRY_DELAY_MS: u64 = 1000;

/// How hard to try before giving up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            base_delay: Duration::from_millis(RETRY_DELAY_MS),
            timeout: HTTP_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            timeout,
        }
    }

    /// Same policy with a different per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts
///
/// `what` names the operation in logs and [`Event::Retrying`] events.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    events: &EventSink,
    what: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = tokio::time::timeout(policy.timeout, operation()) => {
                outcome.unwrap_or(Err(Error::Timeout(policy.timeout)))
            }
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", what, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!("{} attempt {} failed: {}, retrying...", what, attempt, e);
                events.emit(Event::Retrying {
                    operation: what.to_string(),
                    attempt: attempt + 1,
                    error: e.to_string(),
                });
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(policy.delay_for(attempt)) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}
