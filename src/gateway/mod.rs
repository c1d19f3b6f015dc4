//! # HTTP Gateway
//!
//! The axum surface of the service: route handlers under the configured
//! global prefix, `/health` and `/metrics` at the root, and the server loop.

pub mod handlers;
pub mod server;

pub use server::{build_router, serve, AppState};
