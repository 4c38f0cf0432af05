// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for client-side preference state.
//!
//! Holds per-session UI preferences (last visited screen, calendar view,
//! theme...) for the signed-in user. Cleared whenever the user signs out.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde_json::Value;

/// Default number of preference keys kept.
pub const DEFAULT_CAPACITY: usize = 64;

pub struct PreferenceCache {
    cache: Mutex<LruCache<String, Value>>,
}

impl PreferenceCache {
    /// Create a cache holding at most `capacity` keys (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Value>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.lock().put(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().pop(key)
    }

    /// Drop every cached preference.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PreferenceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_and_get() {
        let cache = PreferenceCache::new(4);
        assert!(cache.get("theme").is_none());

        cache.put("theme", json!("dark"));
        assert_eq!(cache.get("theme"), Some(json!("dark")));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = PreferenceCache::default();
        cache.put("theme", json!("dark"));
        cache.put("calendar", json!({"view": "week"}));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = PreferenceCache::new(2);
        cache.put("a", json!(1));
        cache.put("b", json!(2));
        cache.get("a");
        cache.put("c", json!(3));

        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a"), Some(json!(1)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn zero_capacity_keeps_one_entry() {
        let cache = PreferenceCache::new(0);
        cache.put("a", json!(1));
        assert_eq!(cache.remove("a"), Some(json!(1)));
        assert!(cache.is_empty());
    }
}
