//! Response cache keyed by caller-supplied fingerprints.
//!
//! Expiry is lazy: an entry past its TTL is dropped the next time it is looked
//! up. `purge_expired` exists for callers that want to bound memory anyway.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits += 1;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
            #[cfg(debug_assertions)]
            if DF.log_cache {
                log::info!("Cache entry [{}] expired", key);
            }
        }
        self.misses += 1;
        None
    }

    /// Overwrites any existing entry for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    pub fn set_at(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: now,
                ttl,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
