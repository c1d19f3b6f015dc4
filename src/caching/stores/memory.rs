//! # In-Memory Cache Store
//!
//! Process-local cache backed by a `DashMap`, with TTL expiry, LRU eviction
//! once `max_entries` is reached, and a background sweep of expired entries.

use super::{CacheEntry, CacheStore, CacheStoreStats};
use crate::caching::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

/// In-memory cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries before LRU eviction kicks in
    pub max_entries: usize,

    /// Sweep interval for expired entries
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10000,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired_cleanups: AtomicU64,
    memory_usage: AtomicUsize,
}

impl Counters {
    fn release(&self, entry: &CacheEntry) {
        self.memory_usage.fetch_sub(entry.size(), Ordering::Relaxed);
    }
}

/// In-memory cache implementation
pub struct InMemoryCache {
    config: InMemoryCacheConfig,
    entries: Arc<DashMap<String, CacheEntry>>,
    counters: Arc<Counters>,
    cleanup_task: Option<JoinHandle<()>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache.
    ///
    /// The expiry sweep only runs when created inside a Tokio runtime; expired
    /// entries are still never served without it.
    pub fn new(config: InMemoryCacheConfig) -> Self {
        let entries = Arc::new(DashMap::new());
        let counters = Arc::new(Counters::default());

        let cleanup_task = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let entries = entries.clone();
            let counters = counters.clone();
            let cleanup_interval = config.cleanup_interval;

            handle.spawn(async move {
                let mut ticker = interval(cleanup_interval);
                loop {
                    ticker.tick().await;
                    Self::cleanup_expired_entries(&entries, &counters);
                }
            })
        });

        Self {
            config,
            entries,
            counters,
            cleanup_task,
        }
    }

    fn cleanup_expired_entries(entries: &DashMap<String, CacheEntry>, counters: &Counters) {
        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut cleaned = 0;
        for key in expired_keys {
            if let Some((_, entry)) = entries.remove_if(&key, |_, entry| entry.is_expired()) {
                counters.release(&entry);
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            counters.expired_cleanups.fetch_add(cleaned, Ordering::Relaxed);
            debug!("Cleaned up {} expired cache entries", cleaned);
        }
    }

    /// Evict least recently used entries when a new key would exceed capacity
    fn evict_if_needed(&self) {
        let current = self.entries.len();
        if current < self.config.max_entries {
            return;
        }

        // Keep 90% of max entries, evicting at least one
        let evict_count = std::cmp::max(
            current.saturating_sub(self.config.max_entries * 9 / 10),
            1,
        );

        let mut by_age: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.value().last_accessed, entry.key().clone()))
            .collect();
        by_age.sort_by_key(|(last_accessed, _)| *last_accessed);

        let mut evicted = 0;
        for (_, key) in by_age.into_iter().take(evict_count) {
            if let Some((_, entry)) = self.entries.remove(&key) {
                self.counters.release(&entry);
                evicted += 1;
            }
        }

        self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        info!("Evicted {} LRU cache entries", evicted);
    }
}

impl Drop for InMemoryCache {
    fn drop(&mut self) {
        if let Some(task) = self.cleanup_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.is_expired() {
                entry.mark_accessed();
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.value.clone()));
            }
        }

        if let Some((_, expired)) = self.entries.remove_if(key, |_, entry| entry.is_expired()) {
            self.counters.release(&expired);
            self.counters.expired_cleanups.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        if !self.entries.contains_key(key) {
            self.evict_if_needed();
        }

        let entry = CacheEntry::new(value.to_vec(), ttl);
        self.counters
            .memory_usage
            .fetch_add(entry.size(), Ordering::Relaxed);

        if let Some(previous) = self.entries.insert(key.to_string(), entry) {
            self.counters.release(&previous);
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        match self.entries.remove(key) {
            Some((_, entry)) => {
                self.counters.release(&entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self
            .entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn clear(&self) -> CacheResult<()> {
        let count = self.entries.len();
        self.entries.clear();
        self.counters.memory_usage.store(0, Ordering::Relaxed);

        info!("Cleared {} entries from in-memory cache", count);
        Ok(())
    }

    async fn stats(&self) -> CacheResult<CacheStoreStats> {
        Ok(CacheStoreStats {
            entries: self.entries.len(),
            memory_usage: self.counters.memory_usage.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expired_cleanups: self.counters.expired_cleanups.load(Ordering::Relaxed),
        })
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_basic_operations() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());
        let ttl = Duration::from_secs(60);

        cache.set("movies:details:1", b"{\"id\":1}", ttl).await.unwrap();
        let result = cache.get("movies:details:1").await.unwrap();
        assert_eq!(result, Some(b"{\"id\":1}".to_vec()));

        assert!(cache.exists("movies:details:1").await.unwrap());
        assert!(cache.delete("movies:details:1").await.unwrap());
        assert!(!cache.exists("movies:details:1").await.unwrap());
        assert!(!cache.delete("movies:details:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        cache
            .set("genres:list", b"[]", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.exists("genres:list").await.unwrap());

        sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.get("genres:list").await.unwrap(), None);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.expired_cleanups, 1);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());
        let ttl = Duration::from_secs(60);

        cache.set("k", b"first", ttl).await.unwrap();
        cache.set("k", b"second value", ttl).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"second value".to_vec()));
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(
            stats.memory_usage,
            CacheEntry::new(b"second value".to_vec(), ttl).size()
        );
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let config = InMemoryCacheConfig {
            max_entries: 3,
            ..Default::default()
        };
        let cache = InMemoryCache::new(config);
        let ttl = Duration::from_secs(60);

        for i in 0..3 {
            cache.set(&format!("key_{}", i), b"v", ttl).await.unwrap();
            sleep(Duration::from_millis(2)).await;
        }

        // Touch key_0 so key_1 becomes least recently used
        cache.get("key_0").await.unwrap();
        cache.set("key_3", b"v", ttl).await.unwrap();

        assert!(!cache.exists("key_1").await.unwrap());
        assert!(cache.exists("key_0").await.unwrap());
        assert!(cache.exists("key_2").await.unwrap());
        assert!(cache.exists("key_3").await.unwrap());
        assert_eq!(cache.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        cache.set("key1", b"value1", Duration::from_secs(60)).await.unwrap();
        cache.get("key1").await.unwrap();
        cache.get("key2").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!(stats.memory_usage > 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());
        cache.set("a", b"1", Duration::from_secs(60)).await.unwrap();
        cache.set("b", b"2", Duration::from_secs(60)).await.unwrap();

        cache.clear().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.memory_usage, 0);
    }
}
