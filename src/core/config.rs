//! # Configuration Module
//!
//! Gateway configuration: YAML file parsing with serde, environment variable
//! overrides, and fail-fast validation.
//!
//! Loading order:
//! 1. defaults (or the YAML file named by `GATEWAY_CONFIG_PATH`, if set)
//! 2. environment overrides (`API_KEY`, `API_BASE_URL`, `API_VERSION`, ...)
//! 3. [`GatewayConfig::validate`]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::caching::{CacheBackend, CacheConfig};
use crate::core::error::{GatewayError, GatewayResult};
use crate::middleware::rate_limiting::RateLimitConfig;
use crate::observability::logging::{LogConfig, LogFormat};

/// Environment variable naming the optional YAML config file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG_PATH";

/// Main gateway configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Upstream movie metadata API settings
    pub upstream: UpstreamConfig,

    /// Response cache settings
    pub cache: CacheConfig,

    /// Per-client request throttling
    pub rate_limit: RateLimitConfig,

    /// Log level and format
    pub logging: LogConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: String,

    /// Port to listen on
    pub port: u16,

    /// Prefix for every API route
    pub global_prefix: String,

    /// Allowed CORS origin; `*` allows any origin
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            global_prefix: "/api/v1".to_string(),
            cors_origin: "*".to_string(),
        }
    }
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API key sent as the `api_key` query parameter
    pub api_key: String,

    /// Base URL, e.g. `https://api.themoviedb.org`
    pub base_url: String,

    /// API version path segment, e.g. `3`
    pub api_version: String,

    /// Locale sent as the `language` query parameter
    pub language: String,

    /// Total timeout for a single upstream request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            api_version: String::new(),
            language: "en-US".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl UpstreamConfig {
    /// Fail fast if any required value is absent or malformed
    pub fn validate(&self) -> GatewayResult<()> {
        let required = [
            ("API_KEY", &self.api_key),
            ("API_BASE_URL", &self.base_url),
            ("API_VERSION", &self.api_version),
            ("API_LANGUAGE", &self.language),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(GatewayError::config(format!(
                "{} must be defined",
                missing.join(", ")
            )));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::config(format!("Invalid API_BASE_URL: {}", e)))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::config(format!(
                "API_BASE_URL must be an absolute http(s) URL, got {}",
                self.base_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(GatewayError::config("Upstream timeout must be greater than 0"));
        }

        Ok(())
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file, apply environment overrides and validate
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: GatewayConfig = serde_yaml::from_str(&content)?;
        config.apply_overrides(&process_env())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from defaults plus environment variables only
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = GatewayConfig::default();
        config.apply_overrides(&process_env())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `GATEWAY_CONFIG_PATH`, or from the environment
    pub async fn load() -> GatewayResult<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from_file(path).await,
            _ => Self::from_env(),
        }
    }

    /// Apply overrides from a variable map.
    ///
    /// Variable names match the ones the gateway has always been deployed with,
    /// e.g. `API_KEY`, `PORT`, `CACHE_TTL` (seconds).
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> GatewayResult<()> {
        if let Some(value) = vars.get("API_KEY") {
            self.upstream.api_key = value.clone();
        }
        if let Some(value) = vars.get("API_BASE_URL") {
            self.upstream.base_url = value.clone();
        }
        if let Some(value) = vars.get("API_VERSION") {
            self.upstream.api_version = value.clone();
        }
        if let Some(value) = vars.get("API_LANGUAGE") {
            self.upstream.language = value.clone();
        }
        if let Some(value) = vars.get("API_TIMEOUT") {
            self.upstream.timeout = humantime::parse_duration(value)
                .map_err(|e| GatewayError::config(format!("Invalid API_TIMEOUT: {}", e)))?;
        }

        if let Some(value) = vars.get("PORT") {
            self.server.port = value
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid PORT: {}", e)))?;
        }
        if let Some(value) = vars.get("BIND_ADDRESS") {
            self.server.bind_address = value.clone();
        }
        if let Some(value) = vars.get("CORS_ORIGIN") {
            self.server.cors_origin = value.clone();
        }

        if let Some(value) = vars.get("CACHE_TTL") {
            self.cache.default_ttl = Duration::from_secs(parse_number(value, "CACHE_TTL")?);
        }
        if let Some(value) = vars.get("CACHE_BACKEND") {
            self.cache.backend = match value.to_ascii_lowercase().as_str() {
                "memory" => CacheBackend::Memory,
                "redis" => CacheBackend::Redis,
                other => {
                    return Err(GatewayError::config(format!(
                        "Invalid CACHE_BACKEND: {} (expected memory or redis)",
                        other
                    )))
                }
            };
        }
        if let Some(value) = vars.get("REDIS_URL") {
            self.cache.redis.url = value.clone();
        }

        if let Some(value) = vars.get("RATE_LIMIT_TTL") {
            self.rate_limit.window = Duration::from_secs(parse_number(value, "RATE_LIMIT_TTL")?);
        }
        if let Some(value) = vars.get("RATE_LIMIT_MAX") {
            self.rate_limit.max_requests = parse_number(value, "RATE_LIMIT_MAX")?;
        }

        if let Some(value) = vars.get("LOG_LEVEL") {
            self.logging.level = value.clone();
        }
        if let Some(value) = vars.get("LOG_FORMAT") {
            self.logging.format = match value.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(GatewayError::config(format!(
                        "Invalid LOG_FORMAT: {} (expected json or text)",
                        other
                    )))
                }
            };
        }

        Ok(())
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> GatewayResult<()> {
        self.upstream.validate()?;
        self.cache.validate()?;
        self.rate_limit.validate()?;

        if self.server.port == 0 {
            return Err(GatewayError::config("Server port must be greater than 0"));
        }
        // An empty prefix serves the API at the root
        let prefix = &self.server.global_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(GatewayError::config("Global prefix must be empty or start with '/'"));
        }

        Ok(())
    }
}

fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn parse_number<T>(value: &str, name: &str) -> GatewayResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GatewayError::config(format!("Invalid {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> HashMap<String, String> {
        vars(&[
            ("API_KEY", "test-api-key"),
            ("API_BASE_URL", "https://api.test.com"),
            ("API_VERSION", "3"),
            ("API_LANGUAGE", "en-US"),
        ])
    }

    #[test]
    fn test_required_overrides_validate() {
        let mut config = GatewayConfig::default();
        config.apply_overrides(&required()).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.upstream.api_key, "test-api-key");
        assert_eq!(config.upstream.api_version, "3");
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let mut env = required();
        env.remove("API_KEY");

        let mut config = GatewayConfig::default();
        config.apply_overrides(&env).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_missing_base_url_and_version_are_both_reported() {
        let mut config = GatewayConfig::default();
        config
            .apply_overrides(&vars(&[("API_KEY", "k"), ("API_LANGUAGE", "en-US")]))
            .unwrap();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("API_BASE_URL"));
        assert!(message.contains("API_VERSION"));
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let mut env = required();
        env.insert("API_BASE_URL".to_string(), "api.test.com".to_string());

        let mut config = GatewayConfig::default();
        config.apply_overrides(&env).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_numeric_overrides() {
        let mut env = required();
        env.insert("PORT".to_string(), "8080".to_string());
        env.insert("CACHE_TTL".to_string(), "120".to_string());
        env.insert("RATE_LIMIT_TTL".to_string(), "30".to_string());
        env.insert("RATE_LIMIT_MAX".to_string(), "5".to_string());

        let mut config = GatewayConfig::default();
        config.apply_overrides(&env).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(120));
        assert_eq!(config.rate_limit.window, Duration::from_secs(30));
        assert_eq!(config.rate_limit.max_requests, 5);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = GatewayConfig::default();
        let result = config.apply_overrides(&vars(&[("PORT", "not-a-port")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_cache_backend_rejected() {
        let mut config = GatewayConfig::default();
        let result = config.apply_overrides(&vars(&[("CACHE_BACKEND", "memcached")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_global_prefix_validation() {
        let mut config = GatewayConfig::default();
        config.apply_overrides(&required()).unwrap();

        config.server.global_prefix = String::new();
        assert!(config.validate().is_ok());

        config.server.global_prefix = "/api".to_string();
        assert!(config.validate().is_ok());

        config.server.global_prefix = "api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.global_prefix, "/api/v1");
        assert_eq!(config.upstream.language, "en-US");
        assert_eq!(config.cache.default_ttl, Duration::from_secs(3600));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
    }

    #[test]
    fn test_yaml_parsing_with_humantime_durations() {
        let yaml = r#"
server:
  port: 4000
upstream:
  api_key: yaml-key
  base_url: https://api.test.com
  api_version: "3"
  timeout: 5s
cache:
  default_ttl: 10m
rate_limit:
  max_requests: 10
  window: 1m
"#;
        let config: GatewayConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.upstream.timeout, Duration::from_secs(5));
        assert_eq!(config.upstream.language, "en-US");
        assert_eq!(config.cache.default_ttl, Duration::from_secs(600));
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }
}
