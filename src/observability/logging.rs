//! # Structured Logging
//!
//! Subscriber setup and per-component log context.
//!
//! Each service receives a [`ComponentLogger`] when it is constructed. The
//! logger carries a fixed label and a `tracing` span; everything the component
//! logs while serving a call is recorded inside that span, so log lines are
//! tagged with `component=<label>` without any shared mutable logger state.

use serde::{Deserialize, Serialize};
use tracing::{info_span, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::error::{GatewayError, GatewayResult};

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("movie_gateway={},tower_http={}", self.level, self.level)
    }
}

/// Install the global subscriber
pub fn init_logging(config: &LogConfig) -> GatewayResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_directive()))
        .map_err(|e| GatewayError::config(format!("Invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(true).json())
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| GatewayError::internal(format!("Failed to initialize logging: {}", e)))
}

/// Labelled logging context owned by one component
#[derive(Debug, Clone)]
pub struct ComponentLogger {
    label: &'static str,
    span: Span,
}

impl ComponentLogger {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            span: info_span!("component", component = label),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Span to enter (or `instrument` futures with) while the component works
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_label_is_fixed_at_construction() {
        let logger = ComponentLogger::new("GenreService");
        let cloned = logger.clone();

        assert_eq!(logger.label(), "GenreService");
        assert_eq!(cloned.label(), "GenreService");
    }

    #[test]
    fn test_default_directive() {
        let config = LogConfig {
            level: "debug".to_string(),
            format: LogFormat::Text,
        };
        assert_eq!(
            config.default_directive(),
            "movie_gateway=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_log_format_parsing() {
        let config: LogConfig = serde_yaml::from_str("format: text").unwrap();
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, "info");
    }
}
