//! Upstream payload types.
//!
//! Only the fields the gateway reads are typed: ids, genre names, genre id
//! lists and pagination counters. Everything else is kept as opaque JSON in a
//! flattened `extra` map and passed through unchanged.

pub mod genre;
pub mod movie;
pub mod person;

pub use genre::{Genre, GenreList};
pub use movie::{
    DiscoveredMovie, DiscoveryPage, EnrichedMovie, MovieDetails, DEFAULT_PAGE, DEFAULT_SORT,
    MOVIE_APPENDED_RESOURCES,
};
pub use person::{PersonDetails, PERSON_APPENDED_RESOURCES};

/// Opaque upstream fields carried through untouched
pub type Passthrough = serde_json::Map<String, serde_json::Value>;
