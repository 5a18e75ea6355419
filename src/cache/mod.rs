//! Named, bounded key-value caches with global and per-cache enablement.
//!
//! # Design Decisions
//! - The manager is a registry: asking for the same name twice returns the
//!   same cache instance, regardless of the sizing arguments on later calls.
//! - A cache is enabled only when both the manager and the cache itself are;
//!   a disabled cache stores nothing and reads back nothing.
//! - Entries expire after the cache's TTL; the entry count is bounded, with
//!   expired entries evicted before the oldest live one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

/// Registry of named caches sharing one global enable flag.
pub struct CacheManager {
    enabled: bool,
    caches: DashMap<String, Cache>,
}

impl CacheManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            caches: DashMap::new(),
        }
    }

    /// Fetch or create the cache registered under `name`.
    ///
    /// The sizing arguments only apply on first creation; later calls return
    /// the existing instance unchanged. The cache is enabled only if both
    /// the manager and `enabled` are.
    pub fn get_cache(
        &self,
        name: &str,
        max_entries: usize,
        ttl: Duration,
        enabled: bool,
    ) -> Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(max_entries, ttl, self.enabled && enabled))
            .clone()
    }

    /// Names of all registered caches, sorted.
    pub fn list_cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// One size/TTL-bounded key-value cache. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    enabled: bool,
    max_entries: usize,
    ttl: Duration,
    entries: DashMap<String, Entry>,
}

struct Entry {
    value: Value,
    inserted: Instant,
}

impl Cache {
    fn new(max_entries: usize, ttl: Duration, enabled: bool) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                enabled,
                max_entries,
                ttl,
                entries: DashMap::new(),
            }),
        }
    }

    /// A standalone enabled cache not registered with any manager.
    pub fn unmanaged(max_entries: usize, ttl: Duration) -> Self {
        Self::new(max_entries, ttl, true)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Whether `other` is the same underlying instance.
    pub fn same_instance(&self, other: &Cache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Store `value` under `key`. A no-op when the cache is disabled.
    pub fn set(&self, key: &str, value: Value) {
        if !self.inner.enabled {
            return;
        }
        if self.inner.entries.len() >= self.inner.max_entries
            && !self.inner.entries.contains_key(key)
        {
            self.evict_one();
        }
        self.inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Fetch the live value under `key`, if any. Expired entries are removed.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.inner.enabled {
            return None;
        }
        let expired = match self.inner.entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.inner.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.inner.entries.remove(key);
        }
        None
    }

    /// String accessor; `None` for absent or non-string values.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Integer accessor; `None` for absent or non-integer values.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Remove `key`, reporting whether a value was present.
    pub fn delete(&self, key: &str) -> bool {
        if !self.inner.enabled {
            return false;
        }
        self.inner.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Make room for one insertion: drop an expired entry if there is one,
    /// otherwise the oldest live entry. The victim is picked before any
    /// removal so the map is never mutated while iterated.
    fn evict_one(&self) {
        let mut expired: Option<String> = None;
        let mut oldest: Option<(String, Instant)> = None;
        for entry in self.inner.entries.iter() {
            if entry.inserted.elapsed() >= self.inner.ttl {
                expired = Some(entry.key().clone());
                break;
            }
            match &oldest {
                Some((_, inserted)) if *inserted <= entry.inserted => {}
                _ => oldest = Some((entry.key().clone(), entry.inserted)),
            }
        }
        if let Some(key) = expired.or_else(|| oldest.map(|(key, _)| key)) {
            self.inner.entries.remove(&key);
        }
    }
}
