//! # Redis Cache Store
//!
//! Redis-backed cache shared between gateway replicas. Expiry is delegated to
//! Redis (`SET ... EX`), and every key is namespaced with `key_prefix`.

use super::{CacheStore, CacheStoreStats};
use crate::caching::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Key prefix for all cache entries
    pub key_prefix: String,

    /// Maximum number of retries for a failed command
    pub max_retries: u32,

    /// Base delay between retries, multiplied by the attempt number
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "movie-gateway:".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Redis cache implementation
pub struct RedisCache {
    config: RedisCacheConfig,
    connection: ConnectionManager,
    hits: AtomicU64,
    misses: AtomicU64,
    connection_errors: AtomicU64,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn new(config: RedisCacheConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        info!("Redis cache connected to {}", config.url);

        Ok(Self {
            config,
            connection,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Run a command, retrying with linear backoff.
    ///
    /// `ConnectionManager` reconnects on its own; each attempt gets a fresh
    /// clone of the handle.
    async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> CacheResult<T>
    where
        F: Fn(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation(self.connection.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    self.connection_errors.fetch_add(1, Ordering::Relaxed);

                    if attempt >= self.config.max_retries {
                        return Err(CacheError::Redis(e));
                    }

                    attempt += 1;
                    warn!("Redis operation failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let full_key = self.full_key(key);

        let value = self
            .execute_with_retry(|mut conn| {
                let full_key = full_key.clone();
                async move { conn.get::<_, Option<Vec<u8>>>(full_key).await }
            })
            .await?;

        match value {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Redis cache hit for key: {}", key);
                Ok(Some(value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Redis cache miss for key: {}", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let full_key = self.full_key(key);
        // SET EX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);

        self.execute_with_retry(|mut conn| {
            let full_key = full_key.clone();
            async move { conn.set_ex::<_, _, ()>(full_key, value, ttl_seconds).await }
        })
        .await?;

        debug!("Set Redis cache key: {} with TTL: {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key);

        let deleted: i64 = self
            .execute_with_retry(|mut conn| {
                let full_key = full_key.clone();
                async move { conn.del(full_key).await }
            })
            .await?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key);

        self.execute_with_retry(|mut conn| {
            let full_key = full_key.clone();
            async move { conn.exists(full_key).await }
        })
        .await
    }

    async fn clear(&self) -> CacheResult<()> {
        let pattern = format!("{}*", self.config.key_prefix);

        let keys: Vec<String> = self
            .execute_with_retry(|mut conn| {
                let pattern = pattern.clone();
                async move { conn.keys(pattern).await }
            })
            .await?;

        if !keys.is_empty() {
            let count = keys.len();
            self.execute_with_retry(|mut conn| {
                let keys = keys.clone();
                async move { conn.del::<_, ()>(keys).await }
            })
            .await?;
            info!("Cleared {} entries from Redis cache", count);
        }

        Ok(())
    }

    async fn stats(&self) -> CacheResult<CacheStoreStats> {
        let pattern = format!("{}*", self.config.key_prefix);

        let keys: Vec<String> = self
            .execute_with_retry(|mut conn| {
                let pattern = pattern.clone();
                async move { conn.keys(pattern).await }
            })
            .await?;

        Ok(CacheStoreStats {
            entries: keys.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        })
    }

    async fn health_check(&self) -> CacheResult<bool> {
        let pong: String = self
            .execute_with_retry(|mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;

        Ok(pong == "PONG")
    }
}

impl RedisCache {
    /// Number of failed Redis commands since startup
    pub fn connection_errors(&self) -> u64 {
        self.connection_errors.load(Ordering::Relaxed)
    }
}
