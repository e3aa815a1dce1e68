//! Translated-template cache
//!
//! Translation reruns the whole regex pipeline, so translated text is kept
//! per file. An entry is reused only while both the file's modification
//! time and a digest of its raw text are unchanged; either changing forces
//! a fresh translation.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;
use tracing::{debug, info};

struct CacheEntry {
    modified: SystemTime,
    digest: String,
    translated: Arc<str>,
}

/// Per-file cache of translated templates.
///
/// Thread-safe. Translation runs outside any lock, so two threads missing
/// on the same file at once may both translate it; the last insert wins and
/// both results are identical.
#[derive(Default)]
pub struct TranslationCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    stats: RwLock<CacheStatistics>,
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("stats", &self.statistics())
            .finish()
    }
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached translation of `raw`, or translate and cache it.
    pub fn get_or_translate<F>(
        &self,
        path: &Path,
        modified: SystemTime,
        raw: &str,
        translate: F,
    ) -> Arc<str>
    where
        F: FnOnce(&str) -> String,
    {
        let digest = source_digest(raw);

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(path) {
                if entry.modified == modified && entry.digest == digest {
                    debug!("translation cache hit: {}", path.display());
                    self.record(true, None);
                    return Arc::clone(&entry.translated);
                }
            }
        }

        debug!("translation cache miss: {}", path.display());
        let translated: Arc<str> = Arc::from(translate(raw));

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                modified,
                digest,
                translated: Arc::clone(&translated),
            },
        );
        self.record(false, Some(entries.len()));

        translated
    }

    /// Drop one entry. Returns true if it was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let was_present = entries.remove(path).is_some();

        if was_present {
            let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
            stats.cached_entries = entries.len();
            debug!("invalidated translation: {}", path.display());
        }

        was_present
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.cached_entries = 0;

        info!("translation cache cleared");
    }

    /// Snapshot of the cache counters
    pub fn statistics(&self) -> CacheStatistics {
        *self.stats.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, hit: bool, cached_entries: Option<usize>) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.total_requests += 1;
        if hit {
            stats.cache_hits += 1;
        } else {
            stats.cache_misses += 1;
        }
        if let Some(count) = cached_entries {
            stats.cached_entries = count;
        }
    }
}

/// Cache counters.
///
/// ```
/// use rainbridge::cache::CacheStatistics;
///
/// let stats = CacheStatistics {
///     total_requests: 4,
///     cache_hits: 3,
///     cache_misses: 1,
///     cached_entries: 1,
/// };
/// assert_eq!(stats.hit_ratio(), 0.75);
/// assert_eq!(CacheStatistics::default().hit_ratio(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStatistics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached_entries: usize,
}

impl CacheStatistics {
    /// Hits over requests, 0.0 before the first request
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// SHA-256 of a template's raw text, hex encoded
pub fn source_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
