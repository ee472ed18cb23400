//! Jolpica-F1 API client
//!
//! [`JolpicaClient`] is the facade: one method per resource, each building
//! an endpoint path and delegating to the [`http::RequestExecutor`] (or to
//! [`laps::LapsPaginator`] for laps). The executor owns the cache, the rate
//! limiter and the transport for the client's lifetime.
//!
//! ```no_run
//! use jolpica_f1_client::client::{ClientConfig, JolpicaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JolpicaClient::new(ClientConfig::default())?;
//! let laps = client.laps("2024", 5).await?;
//! println!("{}", laps["MRData"]["total"]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod laps;
pub mod retry_formatter;
pub mod transport;

pub use config::ClientConfig;
pub use http::RequestExecutor;
pub use laps::{LapsPaginator, LapsPlan, LapsProgress};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::CacheError;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport kept failing until the last attempt
    #[error("network error after {attempts} attempts: {source}")]
    Network {
        /// Attempts made
        attempts: u32,
        /// Final transport failure
        source: TransportError,
    },

    /// 429 received while waiting on rate limits is disabled
    #[error("rate limit exceeded (server asked to retry after {}s)", .retry_after.as_secs())]
    RateLimitExceeded {
        /// Clamped `Retry-After` value
        retry_after: Duration,
    },

    /// Every attempt failed with a status or malformed body
    #[error("request failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Description of the final failure
        last: String,
    },

    /// Season is neither a four-digit year nor `current`
    #[error("invalid season '{0}': expected a four-digit year or \"current\"")]
    InvalidSeason(String),

    /// HTTP client could not be built
    #[error("transport error: {0}")]
    Transport(String),

    /// Cache could not be opened or cleared
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Check that `season` is a four-digit year or `current`.
///
/// The season becomes a URL path segment, so nothing else is accepted.
pub fn validate_season(season: &str) -> ClientResult<()> {
    let is_year = season.len() == 4 && season.bytes().all(|b| b.is_ascii_digit());
    if season == "current" || is_year {
        Ok(())
    } else {
        Err(ClientError::InvalidSeason(season.to_string()))
    }
}

/// Resources exposed by the results API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Qualifying classification
    Qualifying,
    /// Race classification
    Results,
    /// Per-lap driver timings (paginated)
    Laps,
    /// Drivers' championship standings
    DriverStandings,
    /// Constructors' championship standings
    ConstructorStandings,
    /// Pit stops
    PitStops,
    /// Race schedule
    Races,
}

impl Resource {
    /// Every resource, in display order
    pub const ALL: [Resource; 7] = [
        Resource::Qualifying,
        Resource::Results,
        Resource::Laps,
        Resource::DriverStandings,
        Resource::ConstructorStandings,
        Resource::PitStops,
        Resource::Races,
    ];

    /// Path segment used by the API
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Qualifying => "qualifying",
            Resource::Results => "results",
            Resource::Laps => "laps",
            Resource::DriverStandings => "driverstandings",
            Resource::ConstructorStandings => "constructorstandings",
            Resource::PitStops => "pitstops",
            Resource::Races => "races",
        }
    }

    /// Whether round 0 means "whole season" for this resource
    pub fn has_season_view(&self) -> bool {
        matches!(
            self,
            Resource::DriverStandings | Resource::ConstructorStandings | Resource::Races
        )
    }

    /// Endpoint path for a season and round
    pub fn endpoint(&self, season: &str, round: u32) -> String {
        if round == 0 && self.has_season_view() {
            format!("{season}/{}", self.as_str())
        } else {
            format!("{season}/{round}/{}", self.as_str())
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], "");
        Resource::ALL
            .into_iter()
            .find(|resource| resource.as_str() == normalized)
            .ok_or_else(|| format!("unknown resource: {s}"))
    }
}

/// Facade over the executor and the laps paginator
pub struct JolpicaClient {
    config: ClientConfig,
    executor: RequestExecutor,
}

impl JolpicaClient {
    /// Client talking to the configured base URL over HTTPS
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = transport::build_http_client(config.request_timeout, config.connect_timeout)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Self::with_transport(config, Arc::new(ReqwestTransport::new(http)))
    }

    /// Client over a caller-supplied transport
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> ClientResult<Self> {
        let cache = Arc::new(config.build_cache()?);
        let rate_limiter = Arc::new(config.build_rate_limiter());
        let executor =
            RequestExecutor::new(transport, config.base_url.clone(), rate_limiter, cache)
                .with_max_retries(config.max_retries)
                .with_wait_on_rate_limit(config.wait_on_rate_limit);

        Ok(Self { config, executor })
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying executor
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Paginator configured from this client
    pub fn laps_paginator(&self) -> LapsPaginator<'_> {
        LapsPaginator::new(&self.executor)
            .with_page_size(self.config.page_size)
            .with_page_delay(self.config.page_delay)
    }

    /// Fetch any resource; laps go through the paginator
    pub async fn fetch_resource(
        &self,
        resource: Resource,
        season: &str,
        round: u32,
    ) -> ClientResult<Value> {
        validate_season(season)?;
        if resource == Resource::Laps {
            return self.laps_paginator().fetch_laps(season, round).await;
        }
        let params = [("season", season.to_string()), ("round", round.to_string())];
        self.executor
            .fetch(&resource.endpoint(season, round), &params)
            .await
    }

    /// Qualifying results for a race
    pub async fn qualifying(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::Qualifying, season, round).await
    }

    /// Race results
    pub async fn results(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::Results, season, round).await
    }

    /// Every lap of a race, reassembled from all pages
    pub async fn laps(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::Laps, season, round).await
    }

    /// Drivers' standings; round 0 gives the season table
    pub async fn driver_standings(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::DriverStandings, season, round).await
    }

    /// Constructors' standings; round 0 gives the season table
    pub async fn constructor_standings(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::ConstructorStandings, season, round).await
    }

    /// Pit stops for a race
    pub async fn pitstops(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::PitStops, season, round).await
    }

    /// Race schedule; round 0 gives the whole season
    pub async fn races(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_resource(Resource::Races, season, round).await
    }

    /// Drop every cached response
    pub fn clear_cache(&self) -> ClientResult<usize> {
        let removed = self.executor.cache().clear()?;
        info!(removed, "Cache cleared");
        Ok(removed)
    }

    /// Drop cached responses older than the TTL
    pub fn evict_expired(&self) -> ClientResult<usize> {
        Ok(self.executor.cache().evict_expired()?)
    }
}
