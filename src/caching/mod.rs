//! # Caching System Module
//!
//! Response cache for upstream payloads.
//!
//! ## Architecture
//! 1. **Cache Stores**: the [`CacheStore`] trait with in-memory and Redis
//!    implementations. Stores take an explicit TTL.
//! 2. **Cache Manager**: owns one store, applies the process-wide default TTL,
//!    validates keys and keeps hit/miss statistics. This is the capability the
//!    cached fetch primitive consumes: `get(key)` and `set(key, value)`, nothing
//!    else.
//! 3. **Cache Keys**: [`CacheKey`] derives deterministic keys per entity kind.
//!
//! ## Usage Example
//! ```rust,ignore
//! let cache = CacheManager::new(CacheConfig::default()).await?;
//! let key = CacheKey::movie_details(550);
//!
//! cache.set(key.as_str(), b"{\"id\":550}").await?;
//! assert!(cache.get(key.as_str()).await?.is_some());
//! ```

pub mod cache_manager;
pub mod key_generator;
pub mod stores;

pub use cache_manager::{CacheBackend, CacheConfig, CacheManager, CacheStats};
pub use key_generator::{CacheKey, EntityKind};
pub use stores::{CacheEntry, CacheStore, CacheStoreStats, InMemoryCache, RedisCache};

use crate::core::error::GatewayError;

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid cache key: {message}")]
    InvalidKey { message: String },

    #[error("Cache configuration error: {message}")]
    Configuration { message: String },
}

impl From<CacheError> for GatewayError {
    fn from(err: CacheError) -> Self {
        GatewayError::Cache {
            message: err.to_string(),
        }
    }
}
