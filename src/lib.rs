//! # Jolpica-F1 Client Library
//!
//! A resilient client for the public Jolpica-F1 statistics API
//! (Ergast-compatible motorsport results). The API is rate limited and
//! paginated; this crate takes care of both so callers just ask for a
//! season and round.
//!
//! ## Features
//!
//! - **Rate Limiting**: burst (4/s) and sustained (500/h) ceilings enforced locally
//! - **Caching**: in-memory or on-disk response cache with optional TTL
//! - **Retries**: exponential backoff on transient failures, `Retry-After` on 429
//! - **Lap Pagination**: probes the row count, walks every page and reassembles one envelope
//!
//! ## Quick Start
//!
//! ```no_run
//! use jolpica_f1_client::{laps_from_envelope, ClientConfig, JolpicaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig {
//!     cache_dir: Some("./.jolpica-cache".into()),
//!     cache_ttl_hours: Some(24.0),
//!     ..ClientConfig::default()
//! };
//! let client = JolpicaClient::new(config)?;
//!
//! let envelope = client.laps("2024", 5).await?;
//! for lap in laps_from_envelope(&envelope)? {
//!     println!("lap {} - {} timings", lap.number, lap.timings.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`limits`] - Rate limiter, backoff schedule and `Retry-After` handling
//! - [`cache`] - TTL cache over memory and disk backends
//! - [`client`] - Transport, request executor, laps paginator and the facade
//! - [`laptime`] - `m:ss.mmm` parsing and formatting
//! - [`metrics`] - Counters and histograms through the `metrics` facade
//!
//! Responses are returned as `serde_json::Value` envelopes exactly as the
//! API shaped them. [`Lap`] and [`Timing`] are typed views for callers that
//! want them.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response caching
pub mod cache;

/// CLI command implementations
pub mod cli;

/// API client
pub mod client;

/// Lap time parsing and formatting
pub mod laptime;

/// Rate limits and retry timing
pub mod limits;

/// Observability metrics
pub mod metrics;

pub use cache::{CacheStore, RequestKey};
pub use client::{ClientConfig, ClientError, ClientResult, JolpicaClient, Resource};
pub use limits::RateLimiter;

/// One driver's timing on one lap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Driver identifier (e.g. `max_verstappen`)
    #[serde(rename = "driverId")]
    pub driver_id: String,
    /// Running position at the end of the lap
    pub position: String,
    /// Lap time as `m:ss.mmm`
    pub time: String,
}

impl Timing {
    /// Lap time in milliseconds, if parseable
    pub fn millis(&self) -> Option<u64> {
        laptime::parse_lap_time(&self.time)
    }

    /// Position as a number, if parseable
    pub fn position_number(&self) -> Option<u32> {
        self.position.parse().ok()
    }
}

/// One lap with every driver's timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// Lap number as reported (`"1"`, `"2"`, ...)
    pub number: String,
    /// Timings, one per driver still running
    #[serde(rename = "Timings", default)]
    pub timings: Vec<Timing>,
}

/// Typed laps from `MRData.RaceTable.Races[0].Laps`.
///
/// An envelope without that structure yields an empty list.
pub fn laps_from_envelope(envelope: &Value) -> Result<Vec<Lap>, serde_json::Error> {
    match envelope.pointer("/MRData/RaceTable/Races/0/Laps") {
        Some(laps) => Vec::<Lap>::deserialize(laps),
        None => Ok(Vec::new()),
    }
}
