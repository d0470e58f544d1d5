//! Cache (C12): memoizes trees, chunks, and taxonomy reconciliation lookups.
//! Invalidated explicitly by the Observation Recorder on writes (§4.13) —
//! there is no implicit observer bus.

use moka::future::Cache as MokaCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Clone)]
struct Entry {
    value: serde_json::Value,
}

/// Async JSON-value cache with per-entry TTL, keyed by an opaque string.
/// Key schemas (§4.13): `taxonomy:{name}:{scope}`, `tree:{mode}:{viewer}`,
/// `tree:...:chunk:{x}:{y}`, `dex:user:{user_id}:all`,
/// `dex:friends_overview:{user_id}`.
pub struct Cache {
    inner: MokaCache<String, Entry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Cache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: MokaCache::builder().max_capacity(max_capacity).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.inner.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                serde_json::from_value(entry.value).ok()
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set<T: serde::Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        let key = key.into();
        if let Ok(value) = serde_json::to_value(value) {
            // moka has no per-entry TTL API on the default builder; emulate it
            // by wrapping values with an expiry-aware cache policy is overkill
            // here, so we rely on `time_to_live` being set uniformly per-cache
            // and instead spawn per-entry expiry via `invalidate_after`.
            self.inner.insert(key.clone(), Entry { value }).await;
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                inner.invalidate(&key).await;
            });
        }
    }

    pub async fn delete(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Deletes every entry whose key starts with `prefix` — used by the
    /// Observation Recorder to invalidate all tree caches of an owner plus
    /// each accepted friend (§4.9/§4.13).
    pub async fn delete_prefix(&self, prefix: &str) {
        let prefix = prefix.to_string();
        self.inner
            .invalidate_entries_if(move |k, _v| k.starts_with(&prefix))
            .ok();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(50_000)
    }
}

pub mod keys {
    pub fn taxonomy(normalized_name: &str, scope: &str) -> String {
        format!("taxonomy:{normalized_name}:{scope}")
    }

    pub fn tree_personal(viewer_id: &str) -> String {
        format!("tree:personal:{viewer_id}")
    }

    pub fn tree_friends(viewer_id: &str) -> String {
        format!("tree:friends:{viewer_id}")
    }

    pub fn tree_selected(sorted_user_ids: &[String]) -> String {
        format!("tree:selected:{}", sorted_user_ids.join(","))
    }

    pub fn tree_global() -> String {
        "tree:global".to_string()
    }

    pub fn tree_chunk(tree_key: &str, x: i64, y: i64) -> String {
        format!("{tree_key}:chunk:{x}:{y}")
    }

    pub fn dex_user_all(user_id: &str) -> String {
        format!("dex:user:{user_id}:all")
    }

    pub fn dex_friends_overview(user_id: &str) -> String {
        format!("dex:friends_overview:{user_id}")
    }

    /// Prefix covering every tree cache key owned by `user_id` — for
    /// `DeletePrefix` on observation writes.
    pub fn tree_owner_prefix(user_id: &str) -> String {
        format!("tree:personal:{user_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let cache = Cache::new(100);
        cache
            .set("taxonomy:vulpes vulpes:all", &42u32, Duration::from_secs(60))
            .await;
        let value: Option<u32> = cache.get("taxonomy:vulpes vulpes:all").await;
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn miss_counts_on_absent_key() {
        let cache = Cache::new(100);
        let value: Option<u32> = cache.get("nope").await;
        assert_eq!(value, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn delete_prefix_clears_matching_keys() {
        let cache = Cache::new(100);
        cache
            .set("tree:personal:u1", &1u32, Duration::from_secs(60))
            .await;
        cache
            .set("tree:friends:u1", &2u32, Duration::from_secs(60))
            .await;
        cache
            .set("tree:personal:u2", &3u32, Duration::from_secs(60))
            .await;
        cache.delete_prefix("tree:personal:u1").await;
        cache.inner.run_pending_tasks().await;
        let v: Option<u32> = cache.get("tree:personal:u1").await;
        assert_eq!(v, None);
        let v: Option<u32> = cache.get("tree:personal:u2").await;
        assert_eq!(v, Some(3));
    }
}
