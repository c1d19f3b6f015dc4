//! Movie discovery and movie details.
//!
//! Discovery pages are cached raw, exactly as upstream returned them, and
//! enriched with genre objects on every read. Enrichment never mutates the
//! cached value: [`enrich_page`] consumes a page and builds a new one.

use std::sync::Arc;
use tracing::debug;

use crate::caching::CacheKey;
use crate::core::error::UpstreamError;
use crate::models::{
    DiscoveredMovie, DiscoveryPage, EnrichedMovie, MovieDetails, MOVIE_APPENDED_RESOURCES,
};
use crate::upstream::UpstreamRequest;

use super::fetcher::CachedFetcher;
use super::genres::{GenreCatalog, GenreService};

/// Upstream path of the discovery listing
pub const DISCOVER_PATH: &str = "discover/movie";

/// Attach resolved genres to every result of `page`.
///
/// Unknown genre ids are dropped from `genres` but kept in `genre_ids`. A
/// result without `genre_ids` gets an empty `genres` list. Page metadata and
/// pass-through fields are carried over unchanged.
pub fn enrich_page(
    page: DiscoveryPage<DiscoveredMovie>,
    catalog: &GenreCatalog,
) -> DiscoveryPage<EnrichedMovie> {
    page.map_results(|movie| EnrichedMovie {
        genres: catalog.resolve(movie.genre_ids.as_deref().unwrap_or_default()),
        id: movie.id,
        genre_ids: movie.genre_ids,
        extra: movie.extra,
    })
}

#[derive(Debug, Clone)]
pub struct MovieService {
    fetcher: CachedFetcher,
    genres: Arc<GenreService>,
}

impl MovieService {
    pub fn new(fetcher: CachedFetcher, genres: Arc<GenreService>) -> Self {
        Self { fetcher, genres }
    }

    /// One discovery page with genre ids resolved to genre objects.
    ///
    /// The listing is fetched first; if it fails the genre catalog is never
    /// consulted.
    pub async fn discover(
        &self,
        page: u32,
        sort_by: &str,
    ) -> Result<DiscoveryPage<EnrichedMovie>, UpstreamError> {
        let request = UpstreamRequest::new(DISCOVER_PATH)
            .param("page", page)
            .param("sort_by", sort_by)
            .param("include_adult", false)
            .param("include_video", false);

        let listing: DiscoveryPage<DiscoveredMovie> = self
            .fetcher
            .fetch(request, &CacheKey::movie_discover(page, sort_by))
            .await?;

        let catalog = self.genres.catalog().await?;

        {
            let _guard = self.fetcher.logger().span().enter();
            debug!(page, sort_by, results = listing.results.len(), "Enriching discovery page");
        }

        Ok(enrich_page(listing, &catalog))
    }

    /// Movie details with keywords, credits, images and videos embedded
    pub async fn get_movie(&self, id: u64) -> Result<MovieDetails, UpstreamError> {
        let request = UpstreamRequest::new(format!("movie/{}", id))
            .append_to_response(MOVIE_APPENDED_RESOURCES);

        self.fetcher.fetch(request, &CacheKey::movie_details(id)).await
    }
}
