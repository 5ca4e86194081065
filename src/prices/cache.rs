// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process caches for market data.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::RwLock;

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// Single-value cache that keeps the last good value after it expires.
///
/// Callers check [`TtlCache::fresh`] first and fall back to
/// [`TtlCache::stale`] when a refresh fails.
pub struct TtlCache<T> {
    entry: RwLock<Option<CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    /// The cached value if it is younger than the TTL.
    pub async fn fresh(&self) -> Option<T> {
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// The last stored value regardless of age.
    pub async fn stale(&self) -> Option<T> {
        self.entry.read().await.as_ref().map(|entry| entry.value.clone())
    }

    pub async fn store(&self, value: T) {
        *self.entry.write().await = Some(CacheEntry {
            value,
            fetched_at: Instant::now(),
        });
    }
}

/// LRU cache with per-entry expiry, keyed by query.
pub struct LruTtlCache<K: std::hash::Hash + Eq, V> {
    cache: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K: std::hash::Hash + Eq, V: Clone> LruTtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Returns `None` when missing or expired; expired entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            cache.pop(key);
        }
        None
    }

    pub fn put(&self, key: K, value: V) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    value,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}
