//! # Cache Keys
//!
//! Deterministic cache keys for every cacheable upstream request.
//!
//! Key formats:
//! - `genres:list`
//! - `movies:discover:{page}:{sort_by}`
//! - `movies:details:{id}`
//! - `people:details:{id}`
//!
//! The configured locale is not part of any key. A deployment that changes
//! `API_LANGUAGE` without flushing the cache will serve entries in the
//! previous language until they expire.

use sha2::{Digest, Sha256};
use std::fmt;

/// Entity namespace a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Genres,
    Movies,
    People,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Genres => "genres",
            Self::Movies => "movies",
            Self::People => "people",
        }
    }
}

/// A derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: EntityKind,
    key: String,
}

impl CacheKey {
    /// Key of the genre catalog singleton
    pub fn genre_list() -> Self {
        Self::new(EntityKind::Genres, "list".to_string())
    }

    /// Key of a discovery listing page
    pub fn movie_discover(page: u32, sort_by: &str) -> Self {
        Self::new(EntityKind::Movies, format!("discover:{}:{}", page, sort_by))
    }

    pub fn movie_details(id: u64) -> Self {
        Self::new(EntityKind::Movies, format!("details:{}", id))
    }

    pub fn person_details(id: u64) -> Self {
        Self::new(EntityKind::People, format!("details:{}", id))
    }

    fn new(kind: EntityKind, rest: String) -> Self {
        Self {
            kind,
            key: format!("{}:{}", kind.prefix(), rest),
        }
    }

    /// Fit the key within `max_length`.
    ///
    /// Keys that already fit are returned unchanged. Longer keys are replaced
    /// by `{kind}:sha256:{digest}` of the full key, which stays deterministic
    /// and cannot collide with an unhashed key of the same kind.
    pub fn bounded(self, max_length: usize) -> Self {
        if self.key.len() <= max_length {
            return self;
        }

        let digest = Sha256::digest(self.key.as_bytes());
        Self {
            kind: self.kind,
            key: format!("{}:sha256:{}", self.kind.prefix(), hex::encode(digest)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}
