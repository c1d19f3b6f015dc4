//! # Cached Fetch
//!
//! The read-through primitive every service is built on:
//!
//! 1. look the key up in the cache; a readable hit is returned as-is
//! 2. on a miss, GET the upstream resource
//! 3. on success, write the payload under the key (default TTL) and return it
//!
//! Failures never touch the cache. Only [`UpstreamError`] leaves this module.
//! Concurrent misses on the same key are not coalesced: each performs its own
//! upstream call and the last write wins.

use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn, Instrument};

use crate::caching::{CacheKey, CacheManager};
use crate::core::error::UpstreamError;
use crate::observability::logging::ComponentLogger;
use crate::observability::metrics::{
    CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, UPSTREAM_ERRORS_TOTAL, UPSTREAM_REQUESTS_TOTAL,
    UPSTREAM_REQUEST_DURATION,
};
use crate::upstream::{UpstreamClient, UpstreamRequest};

/// Read-through fetcher shared (by composition) between services
#[derive(Debug, Clone)]
pub struct CachedFetcher {
    client: Arc<UpstreamClient>,
    cache: Arc<CacheManager>,
    logger: ComponentLogger,
}

impl CachedFetcher {
    pub fn new(client: Arc<UpstreamClient>, cache: Arc<CacheManager>, logger: ComponentLogger) -> Self {
        Self {
            client,
            cache,
            logger,
        }
    }

    /// Same client and cache, logging under a different component label
    pub fn for_component(&self, logger: ComponentLogger) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
            logger,
        }
    }

    pub fn logger(&self) -> &ComponentLogger {
        &self.logger
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Return the cached payload for `key`, or fetch `request` and cache it
    pub async fn fetch<T>(&self, request: UpstreamRequest, key: &CacheKey) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Serialize,
    {
        let key = key.clone().bounded(self.cache.max_key_length());
        let span = self.logger.span().clone();

        self.fetch_through(request, key).instrument(span).await
    }

    async fn fetch_through<T>(&self, request: UpstreamRequest, key: CacheKey) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Serialize,
    {
        let component = self.logger.label();

        if let Some(cached) = self.lookup::<T>(&key).await {
            debug!(cache_key = %key, "Cache hit");
            counter!(CACHE_HITS_TOTAL, "component" => component).increment(1);
            return Ok(cached);
        }
        counter!(CACHE_MISSES_TOTAL, "component" => component).increment(1);

        let started = Instant::now();
        counter!(UPSTREAM_REQUESTS_TOTAL, "component" => component).increment(1);
        let result = self.client.get_json::<T>(&request).await;
        histogram!(UPSTREAM_REQUEST_DURATION, "component" => component)
            .record(started.elapsed().as_secs_f64());

        let payload = result.map_err(|e| {
            counter!(UPSTREAM_ERRORS_TOTAL, "component" => component).increment(1);
            error!(cache_key = %key, status = e.status().as_u16(), "Failed to fetch data from upstream API: {}", e);
            e
        })?;

        self.store(&key, &payload).await?;
        Ok(payload)
    }

    /// Readable cached value, if any. Backend failures and undecodable
    /// entries count as misses.
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.cache.get(key.as_str()).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Option<T>>(&bytes) {
                Ok(value) => value,
                Err(e) => {
                    warn!(cache_key = %key, "Ignoring unreadable cache entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = %key, "Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &CacheKey, payload: &T) -> Result<(), UpstreamError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| {
            error!(cache_key = %key, "Failed to serialize payload for caching: {}", e);
            UpstreamError::failure()
        })?;

        self.cache.set(key.as_str(), &bytes).await.map_err(|e| {
            error!(cache_key = %key, "Failed to write cache entry: {}", e);
            UpstreamError::failure()
        })
    }
}
