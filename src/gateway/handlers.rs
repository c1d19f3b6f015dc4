use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::core::error::{ApiError, PathedError};
use crate::models::{
    DiscoveryPage, EnrichedMovie, Genre, MovieDetails, PersonDetails, DEFAULT_PAGE, DEFAULT_SORT,
};

use super::server::AppState;

type HandlerResult<T> = Result<Json<T>, PathedError>;

/// Query string of the discovery endpoint
#[derive(Debug, Default, Deserialize)]
pub struct DiscoverQuery {
    pub page: Option<String>,
    pub sort_by: Option<String>,
    /// Accepted alias of `sort_by`
    pub sorting: Option<String>,
}

impl DiscoverQuery {
    /// Validated page number and sort order, with defaults applied
    pub fn resolve(&self) -> Result<(u32, String), ApiError> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PAGE,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or_else(|| ApiError::validation("page must be a positive integer"))?,
        };

        let sort_by = self
            .sort_by
            .as_deref()
            .or(self.sorting.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT)
            .to_string();

        Ok((page, sort_by))
    }
}

fn parse_id(raw: &str, what: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ApiError::validation(format!("{} id must be a non-negative integer", what)))
}

fn at(uri: &OriginalUri) -> impl FnOnce(ApiError) -> PathedError + '_ {
    move |error| PathedError {
        error,
        path: uri.0.path().to_string(),
    }
}

pub async fn list_genres(
    State(state): State<AppState>,
    uri: OriginalUri,
) -> HandlerResult<Vec<Genre>> {
    let genres = state
        .genres
        .list_genres()
        .await
        .map_err(|e| at(&uri)(e.into()))?;

    Ok(Json(genres))
}

pub async fn discover_movies(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
    uri: OriginalUri,
) -> HandlerResult<DiscoveryPage<EnrichedMovie>> {
    let (page, sort_by) = query.resolve().map_err(at(&uri))?;

    let movies = state
        .movies
        .discover(page, &sort_by)
        .await
        .map_err(|e| at(&uri)(e.into()))?;

    Ok(Json(movies))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: OriginalUri,
) -> HandlerResult<MovieDetails> {
    let id = parse_id(&id, "movie").map_err(at(&uri))?;

    let movie = state
        .movies
        .get_movie(id)
        .await
        .map_err(|e| at(&uri)(e.into()))?;

    Ok(Json(movie))
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: OriginalUri,
) -> HandlerResult<PersonDetails> {
    let id = parse_id(&id, "person").map_err(at(&uri))?;

    let person = state
        .people
        .get_person(id)
        .await
        .map_err(|e| at(&uri)(e.into()))?;

    Ok(Json(person))
}

/// Liveness plus cache backend health
pub async fn health_check(State(state): State<AppState>) -> Response {
    let cache_healthy = match state.cache.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!("Cache health check failed: {}", e);
            false
        }
    };
    let stats = state.cache.stats().await;

    let status = if cache_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if cache_healthy { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "cache": {
            "backend": stats.backend,
            "healthy": cache_healthy,
            "hits": stats.hits,
            "misses": stats.misses,
            "hit_ratio": stats.hit_ratio,
            "entries": stats.store.entries,
        }
    });

    (status, Json(body)).into_response()
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
