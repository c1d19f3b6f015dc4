//! # Cache Stores Module
//!
//! Cache store implementations: in-memory (dashmap) and Redis.

pub mod memory;
pub mod redis_store;

pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis_store::{RedisCache, RedisCacheConfig};

use super::CacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Cached payload with expiry and access metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value
    pub value: Vec<u8>,

    /// When the entry was created
    pub created_at: Instant,

    /// When the entry expires
    pub expires_at: Instant,

    /// Number of times this entry has been read
    pub access_count: u64,

    /// Last read (or write) time, used for LRU eviction
    pub last_accessed: Instant,
}

impl CacheEntry {
    pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
            access_count: 0,
            last_accessed: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Instant::now();
    }

    /// Approximate memory footprint of the entry
    pub fn size(&self) -> usize {
        self.value.len() + std::mem::size_of::<Self>()
    }

    /// Time left until expiration
    pub fn ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Key→bytes store with per-write TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live value from the cache
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set a value in the cache with TTL
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete a value from the cache
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Check if a live key exists in the cache
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Clear all entries from the cache
    async fn clear(&self) -> CacheResult<()>;

    /// Get cache statistics
    async fn stats(&self) -> CacheResult<CacheStoreStats>;

    /// Perform health check
    async fn health_check(&self) -> CacheResult<bool>;
}

/// Cache store statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStoreStats {
    /// Number of entries
    pub entries: usize,

    /// Estimated memory usage in bytes
    pub memory_usage: usize,

    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,

    /// Number of expired entries cleaned up
    pub expired_cleanups: u64,
}
