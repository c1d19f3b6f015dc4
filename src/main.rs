//! # Movie Gateway - Main Entry Point
//!
//! Startup sequence:
//! 1. load configuration (YAML file from `GATEWAY_CONFIG_PATH`, then environment)
//! 2. initialize logging and the Prometheus recorder
//! 3. build the cache, the upstream client and the services
//! 4. serve until SIGINT or SIGTERM

use std::sync::Arc;
use tracing::{error, info};

use movie_gateway::caching::CacheManager;
use movie_gateway::observability::{init_logging, install_prometheus_recorder};
use movie_gateway::upstream::UpstreamClient;
use movie_gateway::{build_router, serve, AppState, GatewayConfig, GatewayResult, Services};

#[tokio::main]
async fn main() -> GatewayResult<()> {
    let config = GatewayConfig::load().await?;
    init_logging(&config.logging)?;

    info!("Starting movie gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        error!("Movie gateway failed: {}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(config: GatewayConfig) -> GatewayResult<()> {
    let metrics = install_prometheus_recorder()?;

    let cache = Arc::new(CacheManager::new(config.cache.clone()).await?);
    info!(
        backend = ?config.cache.backend,
        default_ttl = ?config.cache.default_ttl,
        "Cache ready"
    );

    let client = Arc::new(UpstreamClient::new(&config.upstream)?);
    info!(
        base_url = %config.upstream.base_url,
        language = client.language(),
        "Upstream client ready"
    );

    let services = Services::new(client, cache.clone());
    let state = AppState::new(services, cache, Some(metrics));
    let router = build_router(state, &config.server, &config.rate_limit);

    serve(router, &config.server).await
}
