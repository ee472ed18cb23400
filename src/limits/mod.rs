//! Request pacing: rate limiting and retry backoff
//!
//! - [`rate_limit`] - Burst and sustained sliding-window limiter
//! - [`config`] - Pacing constants, [`BackoffPolicy`] and `Retry-After` handling

pub mod config;
pub mod rate_limit;

pub use config::{retry_after_delay, BackoffPolicy};
pub use rate_limit::{LimitKind, RateLimiter};
