//! Canonical cache keys
//!
//! Parameters are held in a [`BTreeMap`], so two requests carrying the same
//! values in any insertion order produce equal keys and the same digest.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Default page size applied when a request omits `limit`
pub const DEFAULT_LIMIT: u32 = 100;

/// Default offset applied when a request omits `offset`
pub const DEFAULT_OFFSET: u32 = 0;

/// Endpoint path plus canonically ordered query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    endpoint: String,
    params: BTreeMap<String, String>,
}

impl RequestKey {
    /// Build a key; surrounding slashes on `endpoint` are ignored
    pub fn new(endpoint: &str, params: &[(&str, String)]) -> Self {
        let params = params
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        Self {
            endpoint: endpoint.trim_matches('/').to_string(),
            params,
        }
    }

    /// Fill in `limit` and `offset` when the caller did not supply them
    pub fn with_defaults(mut self) -> Self {
        self.params
            .entry("limit".to_string())
            .or_insert_with(|| DEFAULT_LIMIT.to_string());
        self.params
            .entry("offset".to_string())
            .or_insert_with(|| DEFAULT_OFFSET.to_string());
        self
    }

    /// Endpoint path without leading or trailing slashes
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parameters in canonical (sorted) order
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Look up a single parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parameters as owned query pairs, in canonical order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Stable content hash of endpoint and canonical parameters (SHA-256, hex).
    ///
    /// Every field is length-prefixed, so values containing `=` or `&`
    /// cannot collide with a different parameter set.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hash_field(&mut hasher, &self.endpoint);
        for (name, value) in &self.params {
            hash_field(&mut hasher, name);
            hash_field(&mut hasher, value);
        }
        format!("{:x}", hasher.finalize())
    }
}

fn hash_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)?;
        let mut sep = '?';
        for (name, value) in &self.params {
            write!(f, "{sep}{name}={value}")?;
            sep = '&';
        }
        Ok(())
    }
}
