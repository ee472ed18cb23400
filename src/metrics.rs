//! Observability metrics for the request layer
//!
//! Emits through the `metrics` facade, so recording is a no-op until the
//! embedding application installs a recorder (Prometheus, StatsD, ...).
//! Call [`describe_metrics`] once after installing one to register units and
//! help text.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::limits::LimitKind;

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests sent to the results API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 rate limit responses received"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_histogram!(
        "rate_limit_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for the local rate limiter"
    );
    describe_counter!(
        "cache_hits_total",
        Unit::Count,
        "Requests served from the response cache"
    );
    describe_counter!(
        "cache_misses_total",
        Unit::Count,
        "Requests that missed the response cache"
    );
    describe_counter!(
        "fetches_failed_total",
        Unit::Count,
        "Logical fetches that failed after exhausting retries"
    );
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of a single HTTP attempt
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording a new HTTP attempt
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            attempt = attempt,
            "Starting HTTP request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with a status code
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            counter!(
                "http_429_errors_total",
                "endpoint" => self.endpoint.clone(),
            )
            .increment(1);
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a transport failure (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
        )
        .increment(1);
        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Network error recorded"
        );
    }

    /// Correlation ID for this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("http_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("retry_backoff_duration_seconds").record(duration.as_secs_f64());
}

/// Record time spent blocked on the local rate limiter
pub fn record_rate_limit_wait(kind: LimitKind, duration: Duration) {
    histogram!("rate_limit_wait_seconds", "limit" => kind.as_str()).record(duration.as_secs_f64());
}

/// Record a cache lookup outcome
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!("cache_hits_total").increment(1);
    } else {
        counter!("cache_misses_total").increment(1);
    }
}

/// Record a fetch that gave up
pub fn record_fetch_failure(endpoint: &str, reason: &'static str) {
    counter!(
        "fetches_failed_total",
        "endpoint" => endpoint.to_string(),
        "reason" => reason,
    )
    .increment(1);
}
