//! # Discovery Enrichment Tests
//!
//! Service-level behavior against a mocked upstream: enrichment, failure
//! propagation, and read-through caching across services sharing one cache.

use movie_gateway::caching::{CacheConfig, CacheKey, CacheManager};
use movie_gateway::core::config::UpstreamConfig;
use movie_gateway::models::Genre;
use movie_gateway::upstream::UpstreamClient;
use movie_gateway::{Services, UpstreamErrorKind};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn services(upstream: &MockServer) -> (Services, Arc<CacheManager>) {
    let client = UpstreamClient::new(&UpstreamConfig {
        api_key: "test-api-key".to_string(),
        base_url: upstream.uri(),
        api_version: "3".to_string(),
        language: "en-US".to_string(),
        ..Default::default()
    })
    .unwrap();
    let cache = Arc::new(CacheManager::new(CacheConfig::default()).await.unwrap());

    (Services::new(Arc::new(client), cache.clone()), cache)
}

fn discover_mock(expected_calls: u64) -> Mock {
    Mock::given(method("GET"))
        .and(path("/3/discover/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "total_pages": 1,
            "total_results": 1,
            "results": [{ "id": 10, "genre_ids": [1, 2, 99] }]
        })))
        .expect(expected_calls)
}

fn genres_mock(expected_calls: u64) -> Mock {
    Mock::given(method("GET"))
        .and(path("/3/genre/movie/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "genres": [{ "id": 1, "name": "Action" }, { "id": 2, "name": "Adventure" }]
        })))
        .expect(expected_calls)
}

#[tokio::test]
async fn test_discover_end_to_end() {
    let upstream = MockServer::start().await;
    discover_mock(1).mount(&upstream).await;
    genres_mock(1).mount(&upstream).await;
    let (services, _) = services(&upstream).await;

    let page = services.movies.discover(1, "popularity.desc").await.unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, 10);
    assert_eq!(
        page.results[0].genres,
        vec![Genre::new(1, "Action"), Genre::new(2, "Adventure")]
    );
}

#[tokio::test]
async fn test_repeated_discover_is_idempotent() {
    let upstream = MockServer::start().await;
    discover_mock(1).mount(&upstream).await;
    genres_mock(1).mount(&upstream).await;
    let (services, cache) = services(&upstream).await;

    let first = services.movies.discover(1, "popularity.desc").await.unwrap();
    let second = services.movies.discover(1, "popularity.desc").await.unwrap();
    let third = services.movies.discover(1, "popularity.desc").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert!(cache
        .get(CacheKey::movie_discover(1, "popularity.desc").as_str())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_discover_failure_never_queries_catalog() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/3/discover/movie"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&upstream)
        .await;
    genres_mock(0).mount(&upstream).await;
    let (services, cache) = services(&upstream).await;

    let err = services.movies.discover(1, "popularity.desc").await.unwrap_err();

    assert_eq!(err.kind(), UpstreamErrorKind::Unauthorized);
    assert_eq!(err.code(), Some(7));
    assert!(cache
        .get(CacheKey::movie_discover(1, "popularity.desc").as_str())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_catalog_failure_fails_discover() {
    let upstream = MockServer::start().await;
    discover_mock(1).mount(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/3/genre/movie/list"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&upstream)
        .await;
    let (services, _) = services(&upstream).await;

    let err = services.movies.discover(1, "popularity.desc").await.unwrap_err();

    assert_eq!(err.kind(), UpstreamErrorKind::RateLimited);
    assert_eq!(err.code(), Some(25));
}

#[tokio::test]
async fn test_genre_catalog_is_shared_between_listing_and_discovery() {
    let upstream = MockServer::start().await;
    discover_mock(1).mount(&upstream).await;
    genres_mock(1).mount(&upstream).await;
    let (services, _) = services(&upstream).await;

    let genres = services.genres.list_genres().await.unwrap();
    services.movies.discover(1, "popularity.desc").await.unwrap();

    assert_eq!(genres.len(), 2);
}

#[tokio::test]
async fn test_different_pages_are_cached_separately() {
    let upstream = MockServer::start().await;
    discover_mock(2).mount(&upstream).await;
    genres_mock(1).mount(&upstream).await;
    let (services, _) = services(&upstream).await;

    services.movies.discover(1, "popularity.desc").await.unwrap();
    services.movies.discover(2, "popularity.desc").await.unwrap();
    services.movies.discover(2, "popularity.desc").await.unwrap();
}
