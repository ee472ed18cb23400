//! Dual-window request pacing
//!
//! Keeps a sliding log of send instants and delays callers until both the
//! sustained (hourly) and the burst (per-second) ceilings have room.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use super::config::{
    BURST_LIMIT, BURST_MARGIN, BURST_WINDOW, SUSTAINED_LIMIT, SUSTAINED_MARGIN, SUSTAINED_WINDOW,
};

/// Which ceiling forced a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Too many requests in the trailing hour
    Sustained,
    /// Too many requests in the trailing second
    Burst,
}

impl LimitKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::Sustained => "sustained",
            LimitKind::Burst => "burst",
        }
    }
}

/// Sliding-window rate limiter owned by a single client instance
#[derive(Debug)]
pub struct RateLimiter {
    burst_limit: usize,
    burst_window: Duration,
    sustained_limit: usize,
    sustained_window: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the public API defaults (4/s, 500/h)
    pub fn new() -> Self {
        Self::with_limits(BURST_LIMIT, BURST_WINDOW, SUSTAINED_LIMIT, SUSTAINED_WINDOW)
    }

    /// Create a limiter with custom ceilings
    ///
    /// # Arguments
    /// * `burst_limit` - Maximum requests inside `burst_window`
    /// * `burst_window` - Short window, normally one second
    /// * `sustained_limit` - Maximum requests inside `sustained_window`
    /// * `sustained_window` - Long window, normally one hour
    ///
    /// Limits below one are raised to one so a wait can always end.
    pub fn with_limits(
        burst_limit: usize,
        burst_window: Duration,
        sustained_limit: usize,
        sustained_window: Duration,
    ) -> Self {
        Self {
            burst_limit: burst_limit.max(1),
            burst_window,
            sustained_limit: sustained_limit.max(1),
            sustained_window: sustained_window.max(burst_window),
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a request may be sent without breaching either ceiling.
    ///
    /// Re-evaluates after every sleep, so a sustained wait followed by a
    /// burst wait is handled in the same call.
    pub async fn wait_for_slot(&self) {
        loop {
            let pending = self.next_delay(Instant::now());
            let Some((kind, delay)) = pending else {
                return;
            };

            info!(
                limit = kind.as_str(),
                wait_secs = delay.as_secs_f64(),
                "Rate limit reached, waiting"
            );
            crate::metrics::record_rate_limit_wait(kind, delay);
            sleep(delay).await;
        }
    }

    /// Log that a request has just been sent
    pub fn record_request(&self) {
        let now = Instant::now();
        let mut window = self.lock_window();
        Self::prune(&mut window, now, self.sustained_window);
        window.push_back(now);
        debug!(window_len = window.len(), "Recorded request in rate window");
    }

    /// Compute the wait (if any) required at `now`, pruning stale entries.
    ///
    /// Sustained ceiling is checked first; the returned duration already
    /// includes the safety margin for that ceiling.
    pub fn next_delay(&self, now: Instant) -> Option<(LimitKind, Duration)> {
        let mut window = self.lock_window();
        Self::prune(&mut window, now, self.sustained_window);

        if window.len() >= self.sustained_limit {
            let oldest = *window.front()?;
            let remaining = self
                .sustained_window
                .saturating_sub(now.saturating_duration_since(oldest));
            return Some((LimitKind::Sustained, remaining + SUSTAINED_MARGIN));
        }

        let recent = window
            .iter()
            .rev()
            .take_while(|t| now.saturating_duration_since(**t) < self.burst_window)
            .count();
        if recent >= self.burst_limit {
            let oldest_recent = window[window.len() - recent];
            let remaining = self
                .burst_window
                .saturating_sub(now.saturating_duration_since(oldest_recent));
            return Some((LimitKind::Burst, remaining + BURST_MARGIN));
        }

        None
    }

    /// Number of requests currently held in the sustained window
    pub fn window_len(&self) -> usize {
        self.lock_window().len()
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant, horizon: Duration) {
        while let Some(front) = window.front() {
            if now.saturating_duration_since(*front) >= horizon {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock_window(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The window is plain data; a panic elsewhere cannot leave it inconsistent.
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
