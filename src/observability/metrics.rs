//! # Metrics
//!
//! Metric names recorded by the gateway and the Prometheus exporter setup.
//! Recording is a no-op until [`install_prometheus_recorder`] runs, which
//! keeps unit tests free of global state.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::core::error::{GatewayError, GatewayResult};

pub const CACHE_HITS_TOTAL: &str = "gateway_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "gateway_cache_misses_total";
pub const UPSTREAM_REQUESTS_TOTAL: &str = "gateway_upstream_requests_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "gateway_upstream_errors_total";
pub const UPSTREAM_REQUEST_DURATION: &str = "gateway_upstream_request_duration_seconds";
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "gateway_rate_limit_rejections_total";

const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the global Prometheus recorder and return a handle for rendering
pub fn install_prometheus_recorder() -> GatewayResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(UPSTREAM_REQUEST_DURATION.to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| GatewayError::internal(format!("Failed to set histogram buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| GatewayError::internal(format!("Failed to install metrics recorder: {}", e)))
}
