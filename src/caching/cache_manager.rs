//! # Cache Manager
//!
//! The cache manager owns the configured store and applies the process-wide
//! default TTL. Callers never pass a TTL: every write uses `default_ttl`, set
//! once at startup.

use super::{CacheError, CacheResult, CacheStore, CacheStoreStats, InMemoryCache, RedisCache};
use super::stores::{InMemoryCacheConfig, RedisCacheConfig};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Which store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store used for cached payloads
    pub backend: CacheBackend,

    /// TTL applied to every cached payload
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Maximum cache key length; longer keys are hashed by `CacheKey`
    pub max_key_length: usize,

    /// In-memory store configuration
    pub in_memory: InMemoryCacheConfig,

    /// Redis store configuration
    pub redis: RedisCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            default_ttl: Duration::from_secs(3600),
            max_key_length: 250,
            in_memory: InMemoryCacheConfig::default(),
            redis: RedisCacheConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), crate::core::error::GatewayError> {
        use crate::core::error::GatewayError;

        if self.default_ttl.is_zero() {
            return Err(GatewayError::config("Cache TTL must be greater than 0"));
        }
        // Room for the longest fixed prefix plus a SHA-256 digest
        if self.max_key_length < 96 {
            return Err(GatewayError::config(
                "Cache max_key_length must be at least 96",
            ));
        }
        if self.backend == CacheBackend::Memory && self.in_memory.max_entries == 0 {
            return Err(GatewayError::config(
                "In-memory cache max_entries must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Manager-level cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: CacheBackend,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub hit_ratio: f64,
    pub store: CacheStoreStats,
}

/// Read-through cache capability: `get`, `set` with the default TTL
pub struct CacheManager {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.config.backend)
            .field("default_ttl", &self.config.default_ttl)
            .finish()
    }
}

impl CacheManager {
    /// Create the configured store and wrap it
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Memory => {
                info!(
                    "In-memory cache initialized with max {} entries",
                    config.in_memory.max_entries
                );
                Arc::new(InMemoryCache::new(config.in_memory.clone()))
            }
            CacheBackend::Redis => {
                let store = RedisCache::new(config.redis.clone()).await?;
                info!("Redis cache initialized at {}", config.redis.url);
                Arc::new(store)
            }
        };

        Ok(Self::with_store(config, store))
    }

    /// Wrap an existing store
    pub fn with_store(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Get a cached value
    pub async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.validate_key(key)?;

        let value = self.store.get(key).await?;
        match value {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for key: {}", key);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for key: {}", key);
            }
        }

        Ok(value)
    }

    /// Store a value under the default TTL
    pub async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.validate_key(key)?;

        self.store.set(key, value, self.config.default_ttl).await?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        debug!(
            "Cached key: {} with TTL: {:?}",
            key, self.config.default_ttl
        );
        Ok(())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    pub fn max_key_length(&self) -> usize {
        self.config.max_key_length
    }

    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            backend: self.config.backend,
            hits,
            misses,
            writes: self.writes.load(Ordering::Relaxed),
            hit_ratio: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
            store: self.store.stats().await.unwrap_or_default(),
        }
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        self.store.health_check().await
    }

    fn validate_key(&self, key: &str) -> CacheResult<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey {
                message: "Cache key cannot be empty".to_string(),
            });
        }

        if key.len() > self.config.max_key_length {
            return Err(CacheError::InvalidKey {
                message: format!(
                    "Cache key length {} exceeds maximum {}",
                    key.len(),
                    self.config.max_key_length
                ),
            });
        }

        Ok(())
    }
}
