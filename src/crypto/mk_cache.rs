// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for live master keys.
//!
//! Holds plaintext master keys between login and subsequent data calls so
//! the wrapped row does not have to be unwrapped on every request. Entries
//! are `Zeroizing`, so eviction, replacement, and drop all scrub the key
//! material.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::{SecretKey, KEY_LEN};

/// Cached entry: key material + insertion timestamp.
struct CacheEntry {
    key: SecretKey,
    inserted_at: Instant,
}

/// Bounded, thread-safe LRU cache of master keys keyed by user id.
pub struct MasterKeyCache {
    cache: Mutex<LruCache<i64, CacheEntry>>,
    ttl: Duration,
}

impl MasterKeyCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Get the cached master key for a user.
    ///
    /// Returns `None` if not cached or expired.
    pub fn get(&self, user_id: i64) -> Option<SecretKey> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&user_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.key.clone());
            }
            // Expired — evict and zeroize
            cache.pop(&user_id);
        }
        None
    }

    /// Store the master key for a user.
    pub fn put(&self, user_id: i64, key: SecretKey) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                user_id,
                CacheEntry {
                    key,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the cached key for a user.
    pub fn invalidate(&self, user_id: i64) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn key(fill: u8) -> SecretKey {
        Zeroizing::new([fill; KEY_LEN])
    }

    #[test]
    fn put_and_get() {
        let cache = MasterKeyCache::new(4, Duration::from_secs(60));

        assert!(cache.get(1).is_none());
        cache.put(1, key(0xAB));

        let got = cache.get(1).unwrap();
        assert_eq!(*got, [0xAB; KEY_LEN]);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = MasterKeyCache::new(4, Duration::from_secs(60));
        cache.put(1, key(0x01));
        assert!(cache.get(1).is_some());

        cache.invalidate(1);
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn ttl_expiry() {
        let cache = MasterKeyCache::new(4, Duration::from_millis(1));
        cache.put(1, key(0x01));

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(1).is_none());
    }

    #[test]
    fn capacity_bounds_the_cache() {
        let cache = MasterKeyCache::new(2, Duration::from_secs(60));
        cache.put(1, key(0x01));
        cache.put(2, key(0x02));
        cache.put(3, key(0x03));

        // Least-recently-used entry was evicted.
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }
}
