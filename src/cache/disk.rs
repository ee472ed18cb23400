//! File-backed cache backend
//!
//! One JSON file per key, named by [`RequestKey::digest`], holding
//! `{"timestamp": <RFC 3339>, "data": <envelope>}`. Writes go through a
//! temporary file in the same directory followed by an atomic rename.
//! Unreadable or malformed files are reported as misses.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{CacheBackend, CacheEntry, CacheError, RequestKey};

/// Entries larger than this are ignored on read (64 MB)
pub const MAX_ENTRY_FILE_SIZE: u64 = 64 * 1024 * 1024;

const ENTRY_EXTENSION: &str = "json";

/// Durable backend rooted at a cache directory
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (creating if needed) a cache directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CacheError::IoError(format!("Failed to create cache dir {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    /// Root directory of this cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds (or would hold) the entry for `key`
    pub fn path_for(&self, key: &RequestKey) -> PathBuf {
        self.dir.join(format!("{}.{ENTRY_EXTENSION}", key.digest()))
    }

    fn read_entry(path: &Path) -> Option<CacheEntry> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cache file not readable");
                return None;
            }
        };
        if metadata.len() > MAX_ENTRY_FILE_SIZE {
            warn!(
                path = %path.display(),
                size = metadata.len(),
                "Cache file exceeds size limit, ignoring"
            );
            return None;
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache file, treating as miss");
                None
            }
        }
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            CacheError::IoError(format!("Failed to read cache dir {}: {e}", self.dir.display()))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| CacheError::IoError(format!("Failed to read dir entry: {e}")))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn remove_file(path: &Path) -> Result<(), CacheError> {
        fs::remove_file(path).map_err(|e| {
            CacheError::IoError(format!("Failed to remove {}: {e}", path.display()))
        })
    }
}

impl CacheBackend for DiskCache {
    fn load(&self, key: &RequestKey) -> Option<CacheEntry> {
        Self::read_entry(&self.path_for(key))
    }

    fn store(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let json = serde_json::to_vec(entry)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(&json)
            .map_err(|e| CacheError::IoError(format!("Failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| CacheError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .persist(&path)
            .map_err(|e| CacheError::IoError(format!("Failed to persist temp file: {e}")))?;

        debug!(path = %path.display(), key = %key, "Wrote cache entry");
        Ok(())
    }

    fn remove(&self, key: &RequestKey) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            debug!(path = %path.display(), error = %e, "Cache entry not removed");
        }
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let files = self.entry_files()?;
        for path in &files {
            Self::remove_file(path)?;
        }
        Ok(files.len())
    }

    fn retain(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            let stale = match Self::read_entry(&path) {
                Some(entry) => !keep(&entry),
                None => true,
            };
            if stale {
                Self::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn len(&self) -> usize {
        self.entry_files().map(|files| files.len()).unwrap_or(0)
    }
}
