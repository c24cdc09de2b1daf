// SPDX-License-Identifier: GPL-3.0-or-later

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use url::form_urlencoded;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.inserted) > self.ttl
    }
}

/// In-memory cache with per-entry time-to-live.
///
/// Expiry is checked on read: a stale entry is evicted by the `get` that
/// finds it. [`CacheManager::purge_expired`] can be called to sweep eagerly.
#[derive(Debug, Clone)]
pub struct CacheManager<V = Value> {
    default_ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
}

impl<V: Clone> CacheManager<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the value if it is still fresh, evicting it otherwise.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let stale = entries.get(key)?.is_stale(Instant::now());
        if stale {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` under `key` with the default TTL.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store `value` under `key` with an explicit TTL, replacing any prior entry.
    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            inserted: Instant::now(),
            ttl,
        };
        self.entries.lock().await.insert(key.into(), entry);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Remove every stale entry. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now));
        before - entries.len()
    }
}

/// Cache key for an endpoint and its query parameters.
///
/// The endpoint is trimmed of surrounding slashes and the parameters are
/// sorted, so `/a/` with `{x, y}` and `a` with `{y, x}` share a key. Names and
/// values are form-encoded, so a value containing `&` or `=` cannot stand in
/// for a different parameter set.
pub fn cache_key(endpoint: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort();

    let mut query = form_urlencoded::Serializer::new(String::new());
    for (name, value) in sorted {
        query.append_pair(name, value);
    }

    format!("{}:{}", endpoint.trim_matches('/'), query.finish())
}
