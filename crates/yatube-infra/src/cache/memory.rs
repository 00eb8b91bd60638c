//! In-memory cache implementation - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use yatube_core::ports::{Cache, CacheError};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-memory cache using a HashMap behind an async RwLock.
///
/// Used when Redis is not configured. Entries are lost on restart and
/// are not shared between server processes.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    fn is_expired(entry: &CacheEntry) -> bool {
        entry
            .expires_at
            .map(|exp| Instant::now() > exp)
            .unwrap_or(false)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if Self::is_expired(entry) {
            drop(store);
            let mut store = self.store.write().await;
            store.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;

        // Expired entries go on every write, not only when read.
        store.retain(|_, entry| !Self::is_expired(entry));

        let expires_at = ttl.map(|d| Instant::now() + d);

        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        let dropped = store.len();
        store.clear();
        tracing::debug!(entries = dropped, "In-memory cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        cache.set("key1", "value1", None).await.unwrap();
        assert_eq!(cache.get("key1").await, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("index_page:anonymous:1", "<html>", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(cache.exists("index_page:anonymous:1").await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("index_page:anonymous:1").await, None);
    }

    #[tokio::test]
    async fn test_set_evicts_expired_entries() {
        let cache = InMemoryCache::new();
        for page in ["1", "2", "3"] {
            cache
                .set(&format!("index_page:anonymous:{page}"), "<html>", Some(Duration::from_millis(20)))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.set("fresh", "1", None).await.unwrap();

        assert_eq!(cache.store.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = InMemoryCache::new();
        cache.set("a", "1", None).await.unwrap();
        cache.set("b", "2", Some(Duration::from_secs(60))).await.unwrap();

        cache.clear().await.unwrap();

        assert!(!cache.exists("a").await);
        assert!(!cache.exists("b").await);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();
        cache.set("key1", "value1", None).await.unwrap();
        cache.delete("key1").await.unwrap();
        assert_eq!(cache.get("key1").await, None);
    }
}
