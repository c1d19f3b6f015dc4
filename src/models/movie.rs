use serde::{Deserialize, Serialize};

use super::{Genre, Passthrough};

/// Page requested when the client gives none
pub const DEFAULT_PAGE: u32 = 1;

/// Sort order requested when the client gives none
pub const DEFAULT_SORT: &str = "popularity.desc";

/// Sub-resources embedded in a movie details response
pub const MOVIE_APPENDED_RESOURCES: &[&str] = &["keywords", "credits", "images", "videos"];

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPage<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u64,
    #[serde(flatten)]
    pub extra: Passthrough,
}

impl<T> DiscoveryPage<T> {
    /// Build a new page with the same metadata and transformed results
    pub fn map_results<U, F>(self, f: F) -> DiscoveryPage<U>
    where
        F: FnMut(T) -> U,
    {
        DiscoveryPage {
            page: self.page,
            results: self.results.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_results: self.total_results,
            extra: self.extra,
        }
    }
}

/// A discovery result as returned upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredMovie {
    pub id: u64,
    /// Absent upstream stays absent when re-serialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_ids: Option<Vec<u64>>,
    #[serde(flatten)]
    pub extra: Passthrough,
}

/// A discovery result with its genre ids resolved to genres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMovie {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_ids: Option<Vec<u64>>,
    pub genres: Vec<Genre>,
    #[serde(flatten)]
    pub extra: Passthrough,
}

/// Full movie record including appended sub-resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    #[serde(flatten)]
    pub extra: Passthrough,
}

impl MovieDetails {
    /// Embedded sub-resource by name, e.g. `credits`
    pub fn appended(&self, resource: &str) -> Option<&serde_json::Value> {
        self.extra.get(resource)
    }
}
