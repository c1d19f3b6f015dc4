//! # Services
//!
//! Domain services over the cached fetch primitive. Each service owns a
//! [`CachedFetcher`] labelled with its own component name; they share the
//! upstream client and the cache manager.

pub mod fetcher;
pub mod genres;
pub mod movies;
pub mod people;

pub use fetcher::CachedFetcher;
pub use genres::{GenreCatalog, GenreService};
pub use movies::{enrich_page, MovieService};
pub use people::PersonService;

use std::sync::Arc;

use crate::caching::CacheManager;
use crate::observability::logging::ComponentLogger;
use crate::upstream::UpstreamClient;

/// All services, wired to one client and one cache
#[derive(Debug, Clone)]
pub struct Services {
    pub genres: Arc<GenreService>,
    pub movies: Arc<MovieService>,
    pub people: Arc<PersonService>,
}

impl Services {
    pub fn new(client: Arc<UpstreamClient>, cache: Arc<CacheManager>) -> Self {
        let base = CachedFetcher::new(client, cache, ComponentLogger::new("GenreService"));

        let genres = Arc::new(GenreService::new(base.clone()));
        let movies = Arc::new(MovieService::new(
            base.for_component(ComponentLogger::new("MovieService")),
            genres.clone(),
        ));
        let people = Arc::new(PersonService::new(
            base.for_component(ComponentLogger::new("PersonService")),
        ));

        Self {
            genres,
            movies,
            people,
        }
    }
}
