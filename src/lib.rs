//! # Movie Gateway Library
//!
//! A read-through caching gateway in front of a movie metadata API.
//!
//! Every read goes through one primitive: look the request up in the cache,
//! fetch it upstream on a miss, cache the successful payload. Upstream failures
//! are translated into a small, stable error taxonomy before they reach a
//! caller. On top of that primitive sit a genre catalog, a discovery listing
//! enriched with genre objects, and movie and person lookups.
//!
//! ## Modules
//! - `core`: error taxonomy and configuration
//! - `caching`: cache stores (in-memory, Redis), the cache manager and key derivation
//! - `upstream`: the configured HTTP client for the upstream API
//! - `models`: upstream payload types with pass-through fields
//! - `services`: the cached fetch primitive and the domain services
//! - `middleware`: per-client rate limiting
//! - `gateway`: axum router, handlers and the serve loop
//! - `observability`: logging setup, component loggers and metrics

/// Error taxonomy and configuration
pub mod core;

/// Response cache
pub mod caching;

pub mod upstream;

pub mod models;

/// Cached fetch and the genre, movie and person services
pub mod services;

pub mod middleware;

/// HTTP surface
pub mod gateway;

pub mod observability;

pub use crate::core::config::GatewayConfig;
pub use crate::core::error::{ApiError, GatewayError, GatewayResult, UpstreamError, UpstreamErrorKind};
pub use gateway::{build_router, serve, AppState};
pub use services::{CachedFetcher, GenreCatalog, GenreService, MovieService, PersonService, Services};
