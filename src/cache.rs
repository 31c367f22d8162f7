//! Persistent route-path cache.
//!
//! The whole cache is loaded into memory at startup and written back in one
//! piece by [`RouteCache::flush`]. Entries are keyed by route id and kept in an
//! ordered map so identical runs produce byte-identical cache files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StorageError;
use crate::route::CacheEntry;
use crate::storage;

/// Default cache file name.
pub const DEFAULT_CACHE_FILE: &str = "osrm_route_cache.json";

#[derive(Debug, Clone)]
pub struct RouteCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl RouteCache {
    /// Loads the cache stored at `path`.
    ///
    /// A missing file starts an empty cache. An unreadable or malformed file
    /// is logged and also starts an empty cache; it never aborts the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match storage::read_json::<BTreeMap<String, CacheEntry>>(&path) {
            Ok(Some(entries)) => {
                info!(path = %path.display(), routes = entries.len(), "loaded route cache");
                entries
            }
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!(error = %err, "route cache unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces an entry in memory. Nothing is written until
    /// [`flush`](Self::flush).
    pub fn put(&mut self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Writes the full in-memory map to disk, replacing the previous file.
    pub fn flush(&self) -> Result<(), StorageError> {
        storage::write_json(&self.path, &self.entries)?;
        info!(path = %self.path.display(), routes = self.entries.len(), "saved route cache");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
