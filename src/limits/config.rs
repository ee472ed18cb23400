//! Request pacing constants and retry backoff

use std::time::Duration;

/// Maximum number of attempts for one logical fetch.
/// Five attempts with doubling backoff give the upstream roughly half a minute
/// to recover before the fetch is abandoned.
pub const MAX_RETRIES: u32 = 5;

/// Requests permitted inside one burst window.
pub const BURST_LIMIT: usize = 4;

/// Length of the burst window.
pub const BURST_WINDOW: Duration = Duration::from_secs(1);

/// Extra sleep added on top of a computed burst wait.
pub const BURST_MARGIN: Duration = Duration::from_millis(100);

/// Requests permitted inside one sustained window.
pub const SUSTAINED_LIMIT: usize = 500;

/// Length of the sustained window (one hour).
pub const SUSTAINED_WINDOW: Duration = Duration::from_secs(3600);

/// Extra sleep added on top of a computed sustained wait.
pub const SUSTAINED_MARGIN: Duration = Duration::from_secs(1);

/// Wait applied to a 429 response that carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Upper bound for any server-requested `Retry-After` wait (5 minutes).
pub const MAX_RETRY_AFTER_SECS: u64 = 300;

/// Extra sleep added on top of a `Retry-After` wait.
pub const RETRY_AFTER_MARGIN: Duration = Duration::from_millis(100);

/// Initial backoff unit in milliseconds; attempt `n` waits `unit * 2^n`.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff schedule used between failed attempts.
///
/// Attempts are 1-based: the delay after attempt `n` is `base * 2^n`, capped
/// at `max`. Kept as a value so retry timing can be asserted without sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    /// Create a policy with a custom base unit and cap
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to sleep after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(INITIAL_BACKOFF_MS),
            Duration::from_millis(MAX_BACKOFF_MS),
        )
    }
}

/// Turn a raw `Retry-After` header value into the wait to apply.
///
/// Missing or non-numeric values fall back to [`DEFAULT_RETRY_AFTER_SECS`];
/// anything above [`MAX_RETRY_AFTER_SECS`] is clamped.
pub fn retry_after_delay(header: Option<&str>) -> Duration {
    let secs = header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
        .min(MAX_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}
