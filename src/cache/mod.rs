//! Response caching with time-to-live
//!
//! [`CacheStore`] applies the freshness policy; a [`CacheBackend`] only
//! stores and loads raw [`CacheEntry`] values. Two backends ship:
//!
//! - [`memory::MemoryCache`] - process lifetime
//! - [`disk::DiskCache`] - one JSON file per key, durable across runs
//!
//! Expired entries are evicted lazily on read. Read failures are misses,
//! never errors.

pub mod disk;
pub mod key;
pub mod memory;

pub use disk::DiskCache;
pub use key::RequestKey;
pub use memory::MemoryCache;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(String),

    /// Entry could not be serialized
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// A stored response and the moment it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Creation time (serialized as RFC 3339)
    pub timestamp: DateTime<Utc>,
    /// Raw response envelope
    pub data: Value,
}

impl CacheEntry {
    /// Stamp a payload with the current time
    pub fn new(data: Value) -> Self {
        Self::created_at(data, Utc::now())
    }

    /// Stamp a payload with an explicit creation time
    pub fn created_at(data: Value, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, data }
    }

    /// Whether the entry is still valid at `now`.
    ///
    /// `ttl = None` disables expiry. Entries stamped in the future (clock
    /// skew) count as fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Option<Duration>) -> bool {
        let Some(ttl) = ttl else {
            return true;
        };
        match now.signed_duration_since(self.timestamp).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }
}

/// Raw storage behind a [`CacheStore`]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Load the entry for `key`, or `None` if absent or unreadable
    fn load(&self, key: &RequestKey) -> Option<CacheEntry>;

    /// Insert or overwrite the entry for `key`
    fn store(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Drop the entry for `key` if present
    fn remove(&self, key: &RequestKey);

    /// Drop every entry, returning how many were removed
    fn clear(&self) -> Result<usize, CacheError>;

    /// Drop entries for which `keep` returns false (and any unreadable ones)
    fn retain(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError>;

    /// Number of stored entries, fresh or not
    fn len(&self) -> usize;

    /// Whether the backend holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// TTL-aware cache front shared by all backends
#[derive(Debug)]
pub struct CacheStore {
    backend: Option<Box<dyn CacheBackend>>,
    ttl: Option<Duration>,
}

impl CacheStore {
    /// Wrap any backend
    pub fn new(backend: Box<dyn CacheBackend>, ttl: Option<Duration>) -> Self {
        Self {
            backend: Some(backend),
            ttl,
        }
    }

    /// Ephemeral in-memory store
    pub fn memory(ttl: Option<Duration>) -> Self {
        Self::new(Box::new(MemoryCache::new()), ttl)
    }

    /// Persistent store rooted at `dir`
    pub fn disk(
        dir: impl Into<std::path::PathBuf>,
        ttl: Option<Duration>,
    ) -> Result<Self, CacheError> {
        Ok(Self::new(Box::new(DiskCache::new(dir)?), ttl))
    }

    /// Store that never holds anything
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: None,
        }
    }

    /// Configured time-to-live (`None` = never expire)
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Fresh payload for `key`, if any
    pub fn get(&self, key: &RequestKey) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// Fresh payload for `key` as judged at `now`; stale entries are removed
    pub fn get_at(&self, key: &RequestKey, now: DateTime<Utc>) -> Option<Value> {
        let backend = self.backend.as_ref()?;
        let entry = backend.load(key)?;
        if entry.is_fresh_at(now, self.ttl) {
            Some(entry.data)
        } else {
            debug!(key = %key, created = %entry.timestamp, "Cache entry expired");
            backend.remove(key);
            None
        }
    }

    /// Store `payload` under `key`, stamped with the current time
    pub fn put(&self, key: &RequestKey, payload: &Value) -> Result<(), CacheError> {
        self.put_entry(key, &CacheEntry::new(payload.clone()))
    }

    /// Store a pre-built entry
    pub fn put_entry(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), CacheError> {
        match &self.backend {
            Some(backend) => backend.store(key, entry),
            None => Ok(()),
        }
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<usize, CacheError> {
        match &self.backend {
            Some(backend) => backend.clear(),
            None => Ok(0),
        }
    }

    /// Sweep entries that are already stale
    pub fn evict_expired(&self) -> Result<usize, CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(0);
        };
        let now = Utc::now();
        let ttl = self.ttl;
        backend.retain(&|entry| entry.is_fresh_at(now, ttl))
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.backend.as_ref().map_or(0, |backend| backend.len())
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
