//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use super::laps::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE};
use super::transport::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};
use crate::cache::{CacheError, CacheStore};
use crate::limits::config::{
    BURST_LIMIT, BURST_WINDOW, MAX_RETRIES, SUSTAINED_LIMIT, SUSTAINED_WINDOW,
};
use crate::limits::RateLimiter;

/// Public Jolpica-F1 endpoint (Ergast-compatible)
pub const DEFAULT_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";

/// Everything a [`super::JolpicaClient`] can be tuned with
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root without trailing slash
    pub base_url: String,
    /// Attempts per logical fetch
    pub max_retries: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Requests allowed inside `burst_window`
    pub burst_limit: usize,
    /// Short rate window
    pub burst_window: Duration,
    /// Requests allowed inside `sustained_window`
    pub sustained_limit: usize,
    /// Long rate window
    pub sustained_window: Duration,
    /// Rows per laps page
    pub page_size: u32,
    /// Pause between laps pages
    pub page_delay: Duration,
    /// Wait out 429 responses instead of failing
    pub wait_on_rate_limit: bool,
    /// Persist responses here; `None` keeps them in memory
    pub cache_dir: Option<PathBuf>,
    /// Cache lifetime in hours; `None` never expires
    pub cache_ttl_hours: Option<f64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: MAX_RETRIES,
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            burst_limit: BURST_LIMIT,
            burst_window: BURST_WINDOW,
            sustained_limit: SUSTAINED_LIMIT,
            sustained_window: SUSTAINED_WINDOW,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
            wait_on_rate_limit: true,
            cache_dir: None,
            cache_ttl_hours: None,
        }
    }
}

impl ClientConfig {
    /// Cache TTL as a duration; negative or non-finite hours disable expiry
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_hours
            .and_then(|hours| Duration::try_from_secs_f64(hours * 3600.0).ok())
    }

    /// Cache store selected by `cache_dir`
    pub fn build_cache(&self) -> Result<CacheStore, CacheError> {
        match &self.cache_dir {
            Some(dir) => CacheStore::disk(dir.clone(), self.cache_ttl()),
            None => Ok(CacheStore::memory(self.cache_ttl())),
        }
    }

    /// Rate limiter with the configured ceilings
    pub fn build_rate_limiter(&self) -> RateLimiter {
        RateLimiter::with_limits(
            self.burst_limit,
            self.burst_window,
            self.sustained_limit,
            self.sustained_window,
        )
    }
}
