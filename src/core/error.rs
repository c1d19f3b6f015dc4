//! # Error Handling
//!
//! Error types for the movie gateway, built on `thiserror`.
//!
//! There are three layers of errors:
//! - [`UpstreamError`]: the stable taxonomy every service operation returns. It is
//!   only ever constructed by [`UpstreamError::from_status`] (the status
//!   translator) or by [`UpstreamError::new`] for unexpected local failures, so
//!   callers always observe one of four shapes: unauthorized, not-found,
//!   rate-limited or generic failure.
//! - [`ApiError`]: what HTTP handlers return. It wraps [`UpstreamError`] and adds
//!   the failures the serving layer produces on its own (request validation,
//!   local rate limiting), and renders all of them as the same JSON body.
//! - [`GatewayError`]: bootstrap failures (configuration, binding, cache backend
//!   connection) surfaced from `main`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result type used by bootstrap and configuration code
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Message returned when the upstream API rejects our API key
pub const INVALID_API_KEY_MESSAGE: &str = "Invalid API key: You must be granted a valid key";

/// Message returned when the upstream API has no such resource
pub const NOT_FOUND_MESSAGE: &str = "The resource you requested could not be found";

/// Message returned when the upstream API throttles us
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many requests: Your request count is over the allowed limit";

/// Message returned for every other upstream or local failure
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred while fetching data from the upstream API";

/// Upstream error code for an invalid API key
pub const INVALID_API_KEY_CODE: u32 = 7;

/// Upstream error code for a missing resource
pub const NOT_FOUND_CODE: u32 = 34;

/// Upstream error code for an exceeded request quota
pub const RATE_LIMITED_CODE: u32 = 25;

/// The four shapes an [`UpstreamError`] can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorKind {
    Unauthorized,
    NotFound,
    RateLimited,
    Failure,
}

/// Stable domain error for anything that goes wrong while serving upstream data
///
/// Immutable once constructed; fields are exposed through accessors only.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UpstreamError {
    kind: UpstreamErrorKind,
    status: StatusCode,
    code: Option<u32>,
    message: String,
    timestamp: DateTime<Utc>,
}

impl UpstreamError {
    /// Create a generic failure carrying `message`, with status 500 and no code
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            kind: UpstreamErrorKind::Failure,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Generic failure with the standard message
    pub fn failure() -> Self {
        Self::new(GENERIC_FAILURE_MESSAGE)
    }

    /// Translate an upstream HTTP status into the error taxonomy.
    ///
    /// Total over all inputs: unknown statuses fall through to the generic
    /// failure, which carries no internal code and a 500 status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::known(
                UpstreamErrorKind::Unauthorized,
                StatusCode::UNAUTHORIZED,
                INVALID_API_KEY_CODE,
                INVALID_API_KEY_MESSAGE,
            ),
            404 => Self::known(
                UpstreamErrorKind::NotFound,
                StatusCode::NOT_FOUND,
                NOT_FOUND_CODE,
                NOT_FOUND_MESSAGE,
            ),
            429 => Self::known(
                UpstreamErrorKind::RateLimited,
                StatusCode::TOO_MANY_REQUESTS,
                RATE_LIMITED_CODE,
                RATE_LIMITED_MESSAGE,
            ),
            _ => Self::failure(),
        }
    }

    fn known(kind: UpstreamErrorKind, status: StatusCode, code: u32, message: &str) -> Self {
        Self {
            kind,
            status,
            code: Some(code),
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> UpstreamErrorKind {
        self.kind
    }

    /// HTTP status the serving layer should answer with
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Internal (upstream) error code, absent for generic failures
    pub fn code(&self) -> Option<u32> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the error was constructed
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Error type returned by HTTP handlers
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Failure reported by a service operation
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Malformed request parameters
    #[error("{message}")]
    Validation { message: String },

    /// Local request throttling
    #[error("Too many requests, retry in {}s", retry_after.as_secs())]
    TooManyRequests { retry_after: Duration },
}

impl ApiError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream(err) => err.status(),
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Render the error body, tagged with the request path
    pub fn body(&self, path: Option<&str>) -> ErrorBody {
        let (code, timestamp) = match self {
            Self::Upstream(err) => (err.code(), err.timestamp()),
            _ => (None, Utc::now()),
        };

        ErrorBody {
            status_code: self.status_code().as_u16(),
            message: self.to_string(),
            code,
            timestamp,
            path: path.map(str::to_string),
        }
    }
}

/// JSON shape of every error response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Error plus the path of the request that caused it
#[derive(Debug)]
pub struct PathedError {
    pub error: ApiError,
    pub path: String,
}

impl IntoResponse for PathedError {
    fn into_response(self) -> Response {
        render(&self.error, Some(&self.path))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        render(&self, None)
    }
}

fn render(error: &ApiError, path: Option<&str>) -> Response {
    let status = error.status_code();
    let mut response = (status, Json(error.body(path))).into_response();

    if let ApiError::TooManyRequests { retry_after } = error {
        if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }

    response
}

/// Bootstrap errors for the gateway process
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Configuration-related errors (missing values, unreadable files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Cache backend could not be initialized
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O errors (file operations, socket binding, etc.)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Internal errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config(format!("Failed to parse config: {}", err))
    }
}
