//! Retry policy for transient HTTP failures.
//!
//! A failed attempt may be retried when a retry budget is configured, the
//! budget is not exhausted, and the failure is not a client error. 429 is the
//! one client error that is always retryable. Failures without a status
//! (network errors, timeouts) are retryable up to the limit.
//!
//! Backoff is randomized exponential with a cap:
//!
//! ```text
//! delay = delay_min + random(0, 1) * min(delay_max * 2^(attempt - 1), max_backoff)
//! ```

use std::time::Duration;

use crate::config::{DEFAULT_DELAY_MAX_MS, DEFAULT_DELAY_MIN_MS, DEFAULT_MAX_BACKOFF_MS};
use crate::errors::{ApiError, RetryClass};

/// Largest exponent applied to `delay_max` before the cap.
const MAX_EXPONENT: u32 = 16;

/// Returns true when another attempt is allowed.
///
/// `attempt` is the number of the attempt about to be made after a failure
/// (1 for the first retry).
pub fn retry_allowed(attempt: u32, limit: u32, status: Option<u16>) -> bool {
    if limit == 0 || attempt > limit {
        return false;
    }
    !matches!(status, Some(code) if (200..500).contains(&code) && code != 429)
}

/// Retry budget of one logical request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RetryState {
    /// Failed attempts so far.
    pub attempt: u32,
    /// Maximum number of retries.
    pub limit: u32,
}

impl RetryState {
    pub fn new(limit: u32) -> Self {
        Self { attempt: 0, limit }
    }
}

/// Retry decision and backoff computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Minimum delay before any retry.
    pub delay_min: Duration,
    /// Base of the randomized exponential span.
    pub delay_max: Duration,
    /// Upper bound of the randomized span.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_min: Duration::from_millis(DEFAULT_DELAY_MIN_MS),
            delay_max: Duration::from_millis(DEFAULT_DELAY_MAX_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Whether `err` may be retried as attempt number `attempt`.
    pub fn allows(&self, attempt: u32, limit: u32, err: &ApiError) -> bool {
        match err.retry_class() {
            RetryClass::Never => false,
            RetryClass::WithBackoff => retry_allowed(attempt, limit, err.http_status()),
        }
    }

    /// Randomized delay before retry number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_with(attempt, rand::random::<f64>())
    }

    /// Delay before retry number `attempt` for a given jitter in `[0, 1]`.
    pub fn backoff_with(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let span = (self.delay_max.as_millis() as f64 * f64::from(1u32 << exponent))
            .min(self.max_backoff.as_millis() as f64);
        let millis = self.delay_min.as_millis() as f64 + span * jitter.clamp(0.0, 1.0);
        Duration::from_millis(millis as u64)
    }
}
