//! Process-lifetime cache backend

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{CacheBackend, CacheEntry, CacheError, RequestKey};

/// In-memory backend; contents vanish with the client
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<RequestKey, CacheEntry>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RequestKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheBackend for MemoryCache {
    fn load(&self, key: &RequestKey) -> Option<CacheEntry> {
        self.entries().get(key).cloned()
    }

    fn store(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries().insert(key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &RequestKey) {
        self.entries().remove(key);
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    fn retain(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| keep(entry));
        Ok(before - entries.len())
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}
