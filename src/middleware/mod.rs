//! # Middleware
//!
//! Request-level middleware applied to the gateway router.

pub mod rate_limiting;

pub use rate_limiting::{rate_limit_middleware, RateLimitConfig, RateLimitDecision, RateLimiter};
