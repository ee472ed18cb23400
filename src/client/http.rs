//! Request executor
//!
//! One logical fetch: cache lookup, then up to `max_retries` attempts, each
//! gated by the rate limiter. Every attempt that gets an HTTP response is
//! recorded in the limiter window, whatever its status.
//!
//! Failure handling per attempt:
//! - transport error, non-2xx status, malformed body: exponential backoff
//! - 429: sleep for the clamped `Retry-After` value, or fail at once when
//!   `wait_on_rate_limit` is off
//!
//! No sleep follows the final attempt.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::retry_formatter::{extract_error_type, RetryContext, RetryErrorType};
use super::transport::{Transport, TransportError};
use super::{ClientError, ClientResult};
use crate::cache::{CacheStore, RequestKey};
use crate::limits::config::{MAX_RETRIES, RETRY_AFTER_MARGIN};
use crate::limits::{retry_after_delay, BackoffPolicy, RateLimiter};
use crate::metrics::{
    record_cache_lookup, record_fetch_failure, record_retry_backoff, HttpRequestMetrics,
};

/// Why a single attempt did not produce a payload
#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error("{0}")]
    Transport(TransportError),

    #[error("HTTP 429 (retry after {}s)", .0.as_secs())]
    RateLimited(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl AttemptFailure {
    fn error_type(&self) -> RetryErrorType {
        match self {
            Self::Transport(err) => extract_error_type(None, Some(err)),
            Self::RateLimited(_) => RetryErrorType::RateLimit,
            Self::Status(status) => extract_error_type(Some(*status), None),
            Self::Malformed(_) => RetryErrorType::MalformedResponse,
        }
    }
}

/// Parse a response body into an `MRData` envelope.
///
/// Anything that is not a JSON object with a top-level `MRData` key is
/// rejected with a short reason.
pub fn parse_envelope(body: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    if value.get("MRData").is_none() {
        return Err("missing MRData envelope".to_string());
    }
    Ok(value)
}

/// Cached, rate-limited, retrying GET against the results API
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<CacheStore>,
    max_retries: u32,
    backoff: BackoffPolicy,
    wait_on_rate_limit: bool,
}

impl RequestExecutor {
    /// Create an executor with default retry settings
    ///
    /// # Arguments
    /// * `transport` - Where requests are actually sent
    /// * `base_url` - API root, e.g. `https://api.jolpi.ca/ergast/f1`
    /// * `rate_limiter` - Limiter owned by the client
    /// * `cache` - Response cache owned by the client
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<CacheStore>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
            cache,
            max_retries: MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            wait_on_rate_limit: true,
        }
    }

    /// Set the attempt bound (at least one attempt is always made)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Replace the backoff schedule
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether a 429 is waited out (`true`) or fails immediately (`false`)
    pub fn with_wait_on_rate_limit(mut self, wait: bool) -> Self {
        self.wait_on_rate_limit = wait;
        self
    }

    /// Configured attempt bound
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Response cache used by this executor
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Rate limiter used by this executor
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Full URL for an endpoint path
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Fetch `endpoint` with `params`; `limit=100` and `offset=0` are added
    /// when absent.
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> ClientResult<Value> {
        let key = RequestKey::new(endpoint, params).with_defaults();
        self.fetch_key(&key).await
    }

    /// Fetch a pre-built key
    pub async fn fetch_key(&self, key: &RequestKey) -> ClientResult<Value> {
        if let Some(cached) = self.cache.get(key) {
            record_cache_lookup(true);
            debug!(key = %key, "Cache hit");
            return Ok(cached);
        }
        record_cache_lookup(false);
        debug!(key = %key, "Cache miss");

        let url = self.url_for(key.endpoint());
        let query = key.query_pairs();
        let mut attempt = 0;
        let mut last_error = RetryErrorType::NetworkGeneric;

        loop {
            attempt += 1;

            let failure = match self.attempt_once(&url, &query, key, attempt).await {
                Ok(payload) => {
                    if attempt > 1 {
                        let ctx = RetryContext::new(
                            attempt,
                            self.max_retries,
                            last_error,
                            Duration::ZERO,
                            key.to_string(),
                            String::new(),
                        );
                        info!("{}", ctx.format_success());
                    }
                    if let Err(e) = self.cache.put(key, &payload) {
                        warn!(key = %key, error = %e, "Failed to write cache entry");
                    }
                    return Ok(payload);
                }
                Err(failure) => failure,
            };

            if let AttemptFailure::RateLimited(retry_after) = failure {
                if !self.wait_on_rate_limit {
                    warn!(key = %key, "Rate limit hit and waiting is disabled");
                    record_fetch_failure(key.endpoint(), "rate_limited");
                    return Err(ClientError::RateLimitExceeded { retry_after });
                }
            }

            let delay = match failure {
                AttemptFailure::RateLimited(retry_after) => retry_after + RETRY_AFTER_MARGIN,
                _ => self.backoff.delay(attempt),
            };
            last_error = failure.error_type();
            let ctx = RetryContext::new(
                attempt,
                self.max_retries,
                last_error,
                delay,
                key.to_string(),
                failure.to_string(),
            );

            if attempt >= self.max_retries {
                warn!("{}", ctx.format_failure());
                return Err(match failure {
                    AttemptFailure::Transport(source) => {
                        record_fetch_failure(key.endpoint(), "network");
                        ClientError::Network {
                            attempts: attempt,
                            source,
                        }
                    }
                    other => {
                        record_fetch_failure(key.endpoint(), "exhausted");
                        ClientError::Exhausted {
                            attempts: attempt,
                            last: other.to_string(),
                        }
                    }
                });
            }

            warn!("{}", ctx.format_retry());
            record_retry_backoff(delay, attempt);
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt_once(
        &self,
        url: &str,
        query: &[(String, String)],
        key: &RequestKey,
        attempt: u32,
    ) -> Result<Value, AttemptFailure> {
        self.rate_limiter.wait_for_slot().await;

        let metrics = HttpRequestMetrics::start(key.endpoint(), attempt);
        let response = match self.transport.get(url, query).await {
            Ok(response) => response,
            Err(err) => {
                metrics.record_network_error();
                return Err(AttemptFailure::Transport(err));
            }
        };
        metrics.record_complete(response.status);
        self.rate_limiter.record_request();

        if response.status == 429 {
            return Err(AttemptFailure::RateLimited(retry_after_delay(
                response.retry_after.as_deref(),
            )));
        }
        if !response.is_success() {
            return Err(AttemptFailure::Status(response.status));
        }
        parse_envelope(&response.body).map_err(AttemptFailure::Malformed)
    }
}
