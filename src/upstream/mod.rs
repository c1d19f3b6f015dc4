//! # Upstream API Client
//!
//! HTTP access to the movie metadata API. Every request carries the API key
//! and the configured locale as query parameters; failures are translated
//! into [`UpstreamError`](crate::core::error::UpstreamError) before they leave
//! this module.

pub mod client;

pub use client::{UpstreamClient, UpstreamRequest, TRANSPORT_FAILURE_STATUS};
