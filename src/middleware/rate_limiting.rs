//! # Rate Limiting
//!
//! Fixed-window request throttle keyed by client IP.
//!
//! Each client gets a counter that starts at the first request of a window and
//! resets once the window has elapsed. Requests beyond `max_requests` inside a
//! window are rejected with `429 Too Many Requests` and a `Retry-After` header
//! holding the seconds left in the window.
//!
//! ## Usage Example
//! ```rust,ignore
//! let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware));
//! ```

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::core::error::{ApiError, GatewayError, GatewayResult, PathedError};
use crate::observability::metrics::RATE_LIMIT_REJECTIONS_TOTAL;

/// Key used when the peer address is unknown
const UNKNOWN_CLIENT: &str = "unknown";

/// Configuration for rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Requests allowed per client per window
    pub max_requests: u32,

    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Path prefixes that bypass the limiter
    pub exempt_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window: Duration::from_secs(60),
            exempt_paths: vec!["/health".to_string(), "/metrics".to_string()],
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_requests == 0 {
            return Err(GatewayError::config(
                "Rate limit max_requests must be greater than 0",
            ));
        }
        if self.window.is_zero() {
            return Err(GatewayError::config("Rate limit window must be greater than 0"));
        }
        Ok(())
    }
}

/// Outcome of one rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-client fixed-window counters.
///
/// Elapsed windows are swept once per window by a background task when the
/// limiter is created inside a Tokio runtime.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<DashMap<String, Window>>,
    sweep_task: Option<JoinHandle<()>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let windows = Arc::new(DashMap::new());

        let sweep_task = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let windows = windows.clone();
            let window = config.window.max(Duration::from_millis(1));

            handle.spawn(async move {
                let mut ticker = interval(window);
                loop {
                    ticker.tick().await;
                    Self::purge_windows(&windows, window, Instant::now());
                }
            })
        });

        Self {
            config,
            windows,
            sweep_task,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        !self.config.enabled
            || self
                .config
                .exempt_paths
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Count one request for `client` and decide whether it may proceed
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        let window = self.config.window;
        let mut entry = self
            .windows
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= self.config.max_requests {
            let elapsed = now.duration_since(entry.started);
            return RateLimitDecision::Limited {
                retry_after: window.saturating_sub(elapsed),
            };
        }

        entry.count += 1;
        RateLimitDecision::Allowed {
            remaining: self.config.max_requests - entry.count,
        }
    }

    /// Drop windows that have fully elapsed
    pub fn purge_expired(&self) {
        Self::purge_windows(&self.windows, self.config.window, Instant::now());
    }

    fn purge_windows(windows: &DashMap<String, Window>, window: Duration, now: Instant) {
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < window);

        let purged = before.saturating_sub(windows.len());
        if purged > 0 {
            debug!(purged, "Purged elapsed rate limit windows");
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware enforcing the limiter
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if limiter.is_exempt(&path) {
        return next.run(request).await;
    }

    let client = client_key(&request);
    match limiter.check(&client) {
        RateLimitDecision::Allowed { remaining } => {
            debug!(client = %client, remaining, "Rate limit check passed");
            next.run(request).await
        }
        RateLimitDecision::Limited { retry_after } => {
            warn!(client = %client, path = %path, "Rate limit exceeded");
            counter!(RATE_LIMIT_REJECTIONS_TOTAL).increment(1);
            PathedError {
                error: ApiError::TooManyRequests { retry_after },
                path,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window,
            ..Default::default()
        })
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = limiter(3, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(limiter.check_at("1.2.3.4", now), RateLimitDecision::Allowed { remaining: 2 });
        assert!(limiter.check_at("1.2.3.4", now).is_allowed());
        assert!(limiter.check_at("1.2.3.4", now).is_allowed());
        assert!(!limiter.check_at("1.2.3.4", now).is_allowed());
    }

    #[test]
    fn test_clients_are_counted_separately() {
        let limiter = limiter(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("1.1.1.1", now).is_allowed());
        assert!(limiter.check_at("2.2.2.2", now).is_allowed());
        assert!(!limiter.check_at("1.1.1.1", now).is_allowed());
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("c", start).is_allowed());
        assert!(!limiter.check_at("c", start + Duration::from_secs(30)).is_allowed());
        assert!(limiter.check_at("c", start + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_retry_after_is_time_left_in_window() {
        let limiter = limiter(1, Duration::from_secs(60));
        let start = Instant::now();

        limiter.check_at("c", start);
        let decision = limiter.check_at("c", start + Duration::from_secs(45));

        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(15)
            }
        );
    }

    #[test]
    fn test_purge_drops_elapsed_windows() {
        let limiter = limiter(5, Duration::from_millis(20));
        let start = Instant::now();

        for i in 0..100 {
            limiter.check_at(&format!("10.0.0.{}", i), start);
        }
        assert_eq!(limiter.tracked_clients(), 100);

        RateLimiter::purge_windows(&limiter.windows, limiter.config.window, start + Duration::from_millis(10));
        assert_eq!(limiter.tracked_clients(), 100);

        RateLimiter::purge_windows(&limiter.windows, limiter.config.window, start + Duration::from_millis(20));
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[tokio::test]
    async fn test_background_sweep_bounds_tracked_clients() {
        let limiter = limiter(1, Duration::from_millis(10));

        for i in 0..1000 {
            limiter.check(&format!("192.168.{}.{}", i / 256, i % 256));
        }
        assert_eq!(limiter.tracked_clients(), 1000);

        tokio::time::sleep(Duration::from_millis(60)).await;
        limiter.check("203.0.113.7");

        assert!(limiter.tracked_clients() <= 1);
    }

    #[test]
    fn test_exempt_paths_and_disabled_limiter() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.is_exempt("/health"));
        assert!(!limiter.is_exempt("/api/v1/genres"));

        let disabled = RateLimiter::new(RateLimitConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(disabled.is_exempt("/api/v1/genres"));
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::default().validate().is_ok());
        assert!(RateLimitConfig {
            max_requests: 0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(RateLimitConfig {
            window: Duration::ZERO,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
