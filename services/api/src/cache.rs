//! services/api/src/cache.rs
//!
//! A small in-memory TTL cache for GET responses, keyed by user and
//! request path so one user's cached list is never served to another.
//! Write handlers invalidate their resource's prefix; a background task
//! purges expired entries periodically.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const LIST_TTL: Duration = Duration::from_secs(5 * 60);
pub const STATS_TTL: Duration = Duration::from_secs(2 * 60);
pub const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

struct CacheEntry {
    data: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > self.ttl
    }
}

/// Per-user response cache, owned by `AppState`.
#[derive(Default)]
pub struct ResponseCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

fn cache_key(user_id: Uuid, path: &str) -> String {
    format!("{}:{}", user_id, path)
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached response for this user and path, dropping it
    /// if its TTL has elapsed.
    pub async fn get(&self, user_id: Uuid, path: &str) -> Option<Value> {
        let key = cache_key(user_id, path);
        {
            let store = self.store.read().await;
            match store.get(&key) {
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Some(entry.data.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: take the write lock only for the removal.
        self.store.write().await.remove(&key);
        None
    }

    pub async fn insert(&self, user_id: Uuid, path: &str, data: Value, ttl: Duration) {
        let entry = CacheEntry {
            data,
            inserted_at: Instant::now(),
            ttl,
        };
        self.store.write().await.insert(cache_key(user_id, path), entry);
    }

    /// Drops every entry for this user whose path starts with `prefix`.
    /// Used by write handlers so stale lists and stats disappear together.
    pub async fn invalidate(&self, user_id: Uuid, prefix: &str) {
        let key_prefix = cache_key(user_id, prefix);
        self.store
            .write()
            .await
            .retain(|key, _| !key.starts_with(&key_prefix));
    }

    /// Removes expired entries. Called from a periodic background task.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.store.write().await.retain(|_, entry| !entry.is_expired(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn hit_within_ttl_miss_after_expiry() {
        let cache = ResponseCache::new();
        let user = Uuid::new_v4();
        cache
            .insert(user, "/api/assignments", json!([1, 2]), Duration::from_millis(20))
            .await;
        assert_eq!(cache.get(user, "/api/assignments").await, Some(json!([1, 2])));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(user, "/api/assignments").await, None);
    }

    #[tokio::test]
    async fn entries_are_scoped_per_user() {
        let cache = ResponseCache::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        cache.insert(alice, "/api/notes", json!(["a"]), LIST_TTL).await;
        assert!(cache.get(bob, "/api/notes").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_clears_prefix_for_one_user_only() {
        let cache = ResponseCache::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        cache.insert(alice, "/api/assignments", json!([]), LIST_TTL).await;
        cache
            .insert(alice, "/api/assignments/stats", json!({}), STATS_TTL)
            .await;
        cache.insert(bob, "/api/assignments", json!([1]), LIST_TTL).await;

        cache.invalidate(alice, "/api/assignments").await;
        assert!(cache.get(alice, "/api/assignments").await.is_none());
        assert!(cache.get(alice, "/api/assignments/stats").await.is_none());
        assert_eq!(cache.get(bob, "/api/assignments").await, Some(json!([1])));
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let cache = ResponseCache::new();
        let user = Uuid::new_v4();
        cache.insert(user, "/short", json!(1), Duration::from_millis(10)).await;
        cache.insert(user, "/long", json!(2), Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.purge_expired().await;

        let store = cache.store.read().await;
        assert_eq!(store.len(), 1);
    }
}
