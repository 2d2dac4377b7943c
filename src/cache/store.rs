//! Expiring key-value store over Moka.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde_json::Value;
use tokio::time::Instant;

use super::{CacheKey, StoreConfig};

/// A stored upstream response.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    created_at: Instant,
}

/// Shared response store with a single TTL.
///
/// This store is:
/// - Thread-safe and clone-friendly (clones share the same entries)
/// - Unbounded in size; entries only ever go stale
/// - Checked against the TTL on every read, so staleness never depends on
///   when the backing cache gets around to evicting
#[derive(Clone)]
pub struct ExpiringStore {
    inner: Arc<Cache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl ExpiringStore {
    pub fn new(config: StoreConfig) -> Self {
        // Moka's own TTL only reclaims memory; `get` decides freshness.
        let inner = Cache::builder().time_to_live(config.ttl).build();

        Self {
            inner: Arc::new(inner),
            ttl: config.ttl,
        }
    }

    /// Get a value if present and younger than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let entry = self.inner.get(key)?;
        if entry.created_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.value)
    }

    /// Store a value stamped with the current time, replacing any prior entry.
    pub fn set(&self, key: CacheKey, value: Value) {
        self.inner.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate number of resident entries, including stale ones not yet reclaimed.
    ///
    /// Moka updates the count lazily, so recent writes may not be reflected yet.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for ExpiringStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for ExpiringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("ttl", &self.ttl)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}
