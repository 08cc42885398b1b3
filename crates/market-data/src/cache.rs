//! TTL key/value cache with lazy expiry.
//!
//! Used for stock snapshots (short TTL) and for each provider's
//! symbol-to-identifier resolutions (long TTL). Entries expire only when read;
//! there is no background sweeper and no capacity bound, the universe of listed
//! symbols being small and closed.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::warn;
use tokio::time::Instant;

use crate::models::Exchange;

/// Default lifetime of a cached stock snapshot.
pub const DEFAULT_STOCK_TTL: Duration = Duration::from_secs(60 * 60);

/// Default lifetime of a cached symbol resolution.
pub const DEFAULT_RESOLUTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Normalized cache key for a symbol on an exchange: `"NSE:RELIANCE"`.
pub fn cache_key(symbol: &str, exchange: Exchange) -> String {
    format!("{}:{}", exchange.as_str(), symbol.trim().to_uppercase())
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory TTL cache.
///
/// Concurrent misses on the same key may both reach upstream and both write;
/// the last write wins.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Response cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Response cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// The cached value, if present and not yet expired.
    ///
    /// An expired entry is evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.read_entries();
            match entries.get(key) {
                None => return None,
                Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.write_entries();
        // Re-check: another writer may have refreshed the entry in between.
        if let Some(entry) = entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.write_entries()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Store with the cache's default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    pub fn remove(&self, key: &str) {
        self.write_entries().remove(key);
    }

    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
