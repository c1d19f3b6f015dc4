//! Genre catalog: the small, rarely-changing list of movie genres, cached as a
//! singleton resource and used as the lookup table for discovery enrichment.

use std::collections::HashMap;
use tracing::debug;

use crate::caching::CacheKey;
use crate::core::error::UpstreamError;
use crate::models::{Genre, GenreList};
use crate::upstream::UpstreamRequest;

use super::fetcher::CachedFetcher;

/// Upstream path of the genre listing
pub const GENRE_LIST_PATH: &str = "genre/movie/list";

/// Genres in upstream order, indexed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreCatalog {
    genres: Vec<Genre>,
    index: HashMap<u64, usize>,
}

impl GenreCatalog {
    pub fn new(genres: Vec<Genre>) -> Self {
        let mut index = HashMap::with_capacity(genres.len());
        for (position, genre) in genres.iter().enumerate() {
            // First occurrence wins if upstream ever repeats an id
            index.entry(genre.id).or_insert(position);
        }
        Self { genres, index }
    }

    pub fn get(&self, id: u64) -> Option<&Genre> {
        self.index.get(&id).map(|&position| &self.genres[position])
    }

    /// Resolve ids in order, dropping the ones the catalog does not know
    pub fn resolve(&self, ids: &[u64]) -> Vec<Genre> {
        ids.iter().filter_map(|&id| self.get(id).cloned()).collect()
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }
}

/// Cached access to the genre catalog
#[derive(Debug, Clone)]
pub struct GenreService {
    fetcher: CachedFetcher,
}

impl GenreService {
    pub fn new(fetcher: CachedFetcher) -> Self {
        Self { fetcher }
    }

    /// All movie genres, without the upstream envelope
    pub async fn list_genres(&self) -> Result<Vec<Genre>, UpstreamError> {
        let list: GenreList = self
            .fetcher
            .fetch(UpstreamRequest::new(GENRE_LIST_PATH), &CacheKey::genre_list())
            .await?;

        Ok(list.genres)
    }

    /// The genre list as an id lookup table
    pub async fn catalog(&self) -> Result<GenreCatalog, UpstreamError> {
        let catalog = GenreCatalog::new(self.list_genres().await?);
        let _guard = self.fetcher.logger().span().enter();
        debug!(genres = catalog.len(), "Genre catalog loaded");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> GenreCatalog {
        GenreCatalog::new(vec![
            Genre::new(28, "Action"),
            Genre::new(12, "Adventure"),
            Genre::new(35, "Comedy"),
        ])
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = catalog();
        assert_eq!(catalog.get(12), Some(&Genre::new(12, "Adventure")));
        assert_eq!(catalog.get(99), None);
    }

    #[test]
    fn test_resolve_preserves_order_and_drops_unknown_ids() {
        let resolved = catalog().resolve(&[35, 99, 28]);
        assert_eq!(resolved, vec![Genre::new(35, "Comedy"), Genre::new(28, "Action")]);
    }

    #[test]
    fn test_resolve_keeps_duplicates() {
        let resolved = catalog().resolve(&[28, 28]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_catalog_keeps_upstream_order() {
        let ids: Vec<u64> = catalog().genres().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![28, 12, 35]);
    }

    #[test]
    fn test_empty_catalog_resolves_nothing() {
        let catalog = GenreCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.resolve(&[1, 2, 3]).is_empty());
    }
}
