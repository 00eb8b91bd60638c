//! Redis page cache, shared by every server process pointing at the same Redis.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use yatube_core::ports::{Cache, CacheError};

/// Keys requested per `SCAN` round trip in `clear`.
const CLEAR_BATCH_SIZE: usize = 500;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Namespace prepended to every key; `clear` only touches this namespace.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "yatube:".to_string(),
        }
    }
}

impl RedisConfig {
    /// Configuration for `url`, remaining settings from the environment.
    pub fn from_env(url: String) -> Self {
        Self {
            url,
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            key_prefix: std::env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "yatube:".to_string()),
        }
    }
}

/// Redis-backed cache implementation.
///
/// Uses connection manager for automatic reconnection.
pub struct RedisCache {
    conn: ConnectionManager,
    config: RedisConfig,
}

impl RedisCache {
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, prefix = %config.key_prefix, "Connected to Redis cache");

        Ok(Self { conn, config })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(self.key(key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);

        match ttl {
            Some(duration) => {
                conn.pset_ex::<_, _, ()>(key, value, duration.as_millis().max(1) as u64)
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(key))
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(self.key(key)).await.unwrap_or(false)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.config.key_prefix);
        let mut cursor = 0u64;
        let mut dropped = 0usize;

        // SCAN walks the keyspace incrementally; each batch is deleted as it arrives.
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(CLEAR_BATCH_SIZE)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Operation(e.to_string()))?;

            if !keys.is_empty() {
                conn.del::<_, ()>(&keys)
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
                dropped += keys.len();
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(entries = dropped, "Redis cache namespace cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get_test_cache() -> Option<RedisCache> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            key_prefix: format!("yatube-test-{}:", uuid::Uuid::new_v4()),
        };

        RedisCache::new(config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_cache_set_get() {
        let cache = match get_test_cache().await {
            Some(c) => c,
            None => {
                tracing::warn!("Redis not available, skipping test");
                return;
            }
        };

        cache.set("index_page:anonymous:1", "<html>", None).await.unwrap();
        assert_eq!(
            cache.get("index_page:anonymous:1").await,
            Some("<html>".to_string())
        );

        cache.delete("index_page:anonymous:1").await.unwrap();
        assert_eq!(cache.get("index_page:anonymous:1").await, None);
    }

    #[tokio::test]
    async fn test_redis_cache_clear_namespace() {
        let cache = match get_test_cache().await {
            Some(c) => c,
            None => return,
        };

        // More keys than one SCAN batch.
        for i in 0..(CLEAR_BATCH_SIZE * 2 + 7) {
            cache
                .set(&format!("index_page:anonymous:{i}"), "<html>", Some(Duration::from_secs(30)))
                .await
                .unwrap();
        }

        cache.clear().await.unwrap();

        assert!(!cache.exists("index_page:anonymous:0").await);
        assert!(!cache.exists(&format!("index_page:anonymous:{}", CLEAR_BATCH_SIZE * 2 + 6)).await);
    }
}
