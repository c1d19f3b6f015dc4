//! # HTTP Server
//!
//! Router construction and the serve loop. API routes are nested under the
//! configured global prefix; `/health` and `/metrics` stay at the root.
//!
//! Layer order, outermost first: trace, CORS, security headers, compression,
//! rate limiting.

use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::caching::CacheManager;
use crate::core::config::ServerConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::middleware::rate_limiting::{rate_limit_middleware, RateLimitConfig, RateLimiter};
use crate::services::{GenreService, MovieService, PersonService, Services};

use super::handlers;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub genres: Arc<GenreService>,
    pub movies: Arc<MovieService>,
    pub people: Arc<PersonService>,
    pub cache: Arc<CacheManager>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(services: Services, cache: Arc<CacheManager>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            genres: services.genres,
            movies: services.movies,
            people: services.people,
            cache,
            metrics,
        }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origin.trim() == "*" {
        return layer.allow_origin(Any);
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState, server: &ServerConfig, rate_limit: &RateLimitConfig) -> Router {
    let api = Router::new()
        .route("/genres", get(handlers::list_genres))
        .route("/movies/discover", get(handlers::discover_movies))
        .route("/movies/:id", get(handlers::get_movie))
        .route("/people/:id", get(handlers::get_person));

    let prefix = server.global_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    let limiter = Arc::new(RateLimiter::new(rate_limit.clone()));

    app.route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.cors_origin))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("SAMEORIGIN"),
                ))
                .layer(CompressionLayer::new())
                .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware)),
        )
}

/// Bind and serve until ctrl-c or SIGTERM
pub async fn serve(router: Router, server: &ServerConfig) -> GatewayResult<()> {
    let addr = format!("{}:{}", server.bind_address, server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::internal(format!("Failed to bind server to {}: {}", addr, e)))?;

    info!("Movie gateway listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| GatewayError::internal(format!("Server error: {}", e)))?;

    info!("Movie gateway shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
