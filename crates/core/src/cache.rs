//! Bounded query result cache.
//!
//! Entries are keyed by a scope, the bit pattern of the query vector and `k`,
//! so two queries hit the same entry exactly when they come from the same
//! scope and their vectors are equal element-wise. A [`VectorStore`] uses its
//! collection name as the scope, which lets several stores share one cache.
//! Each entry expires `max_age` after it was stored; expired entries are
//! dropped lazily on lookup.
//!
//! [`VectorStore`]: crate::storage::VectorStore

use crate::config;
use crate::hnsw::ScoredNode;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Sizing and expiry for a [`QueryCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: config::CACHE_DEFAULT_MAX_ENTRIES,
            max_age: Duration::from_millis(config::CACHE_DEFAULT_MAX_AGE_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    scope: String,
    bits: Vec<u32>,
    k: usize,
}

impl CacheKey {
    fn new(scope: &str, vector: &[f32], k: usize) -> Self {
        // -0.0 and 0.0 compare equal, so they must hash equal too.
        let bits = vector
            .iter()
            .map(|&v| if v == 0.0 { 0.0f32.to_bits() } else { v.to_bits() })
            .collect();
        Self {
            scope: scope.to_string(),
            bits,
            k,
        }
    }
}

struct CacheEntry {
    stored_at: Instant,
    results: Vec<ScoredNode>,
}

/// LRU cache of query results with per-entry expiry.
pub struct QueryCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    max_age: Duration,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_age: config.max_age,
        }
    }

    /// Returns the cached results for `(vector, k)` in `scope` if present and not expired.
    pub fn get(&self, scope: &str, vector: &[f32], k: usize) -> Option<Vec<ScoredNode>> {
        let key = CacheKey::new(scope, vector, k);
        let mut entries = self.entries.lock();
        let expired = match entries.get(&key) {
            None => {
                tracing::debug!(scope, k, "query cache miss");
                return None;
            }
            Some(entry) if entry.stored_at.elapsed() <= self.max_age => {
                tracing::debug!(scope, k, hits = entry.results.len(), "query cache hit");
                return Some(entry.results.clone());
            }
            Some(entry) => entry.stored_at.elapsed(),
        };
        entries.pop(&key);
        tracing::debug!(k, age_ms = expired.as_millis() as u64, "dropped expired cache entry");
        None
    }

    /// Stores results for `(vector, k)` in `scope`, evicting the least recently used entry when full.
    pub fn set(&self, scope: &str, vector: &[f32], k: usize, results: Vec<ScoredNode>) {
        let entry = CacheEntry {
            stored_at: Instant::now(),
            results,
        };
        self.entries.lock().put(CacheKey::new(scope, vector, k), entry);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drops every entry stored under `scope`, leaving other scopes intact.
    pub fn clear_scope(&self, scope: &str) {
        let mut entries = self.entries.lock();
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.scope == scope)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        tracing::debug!(scope, dropped = stale.len(), "cleared cache scope");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .field("max_age", &self.max_age)
            .finish()
    }
}
