use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, error};
use url::Url;

use crate::core::config::UpstreamConfig;
use crate::core::error::{GatewayError, GatewayResult, UpstreamError};

/// Status fed to the translator when no HTTP response was received
/// (connection refused, DNS failure, timeout, ...)
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Path and query of one upstream GET, before auth and locale are added
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    path: String,
    params: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Append a query parameter
    pub fn param<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Request embedded sub-resources via `append_to_response`
    pub fn append_to_response(self, resources: &[&str]) -> Self {
        self.param("append_to_response", resources.join(","))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Configured client for the upstream API
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: Url,
    api_version: String,
    api_key: String,
    language: String,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    /// Build a client, failing fast on incomplete configuration
    pub fn new(config: &UpstreamConfig) -> GatewayResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::config(format!("Invalid API_BASE_URL: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_version: config.api_version.trim_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Full URL for `request`: base URL, version segment, path, request
    /// parameters, then `language` and `api_key`
    pub fn url_for(&self, request: &UpstreamRequest) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                UpstreamError::new(format!("Base URL {} cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty();
            segments.extend(self.api_version.split('/').filter(|s| !s.is_empty()));
            segments.extend(request.path().split('/').filter(|s| !s.is_empty()));
        }

        url.query_pairs_mut()
            .extend_pairs(request.params())
            .append_pair("language", &self.language)
            .append_pair("api_key", &self.api_key);

        Ok(url)
    }

    /// GET `request` and decode the body as `T`.
    ///
    /// Transport failures and non-2xx statuses go through
    /// [`UpstreamError::from_status`]; an undecodable body is a generic failure.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        request: &UpstreamRequest,
    ) -> Result<T, UpstreamError> {
        let url = self.url_for(request)?;
        let started = Instant::now();

        debug!(path = request.path(), "Fetching from upstream API");

        let response = self.http.get(url).send().await.map_err(|e| {
            let status = e
                .status()
                .map(|s| s.as_u16())
                .unwrap_or(TRANSPORT_FAILURE_STATUS);
            error!(path = request.path(), timeout = e.is_timeout(), "Upstream request failed: {}", e);
            UpstreamError::from_status(status)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(path = request.path(), status = status.as_u16(), "Upstream API returned an error status");
            return Err(UpstreamError::from_status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            error!(path = request.path(), "Failed to read upstream response body: {}", e);
            UpstreamError::failure()
        })?;

        let payload = serde_json::from_slice(&body).map_err(|e| {
            error!(path = request.path(), "Failed to decode upstream response: {}", e);
            UpstreamError::failure()
        })?;

        debug!(
            path = request.path(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Received upstream response"
        );

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> UpstreamConfig {
        UpstreamConfig {
            api_key: "test-api-key".to_string(),
            base_url: base_url.to_string(),
            api_version: "3".to_string(),
            language: "en-US".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_includes_version_path_params_and_auth() {
        let client = UpstreamClient::new(&config("https://api.test.com")).unwrap();
        let request = UpstreamRequest::new("discover/movie")
            .param("page", 2)
            .param("sort_by", "popularity.desc");

        let url = client.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.test.com/3/discover/movie?page=2&sort_by=popularity.desc&language=en-US&api_key=test-api-key"
        );
    }

    #[test]
    fn test_url_handles_trailing_and_leading_slashes() {
        let client = UpstreamClient::new(&config("https://api.test.com/tmdb/")).unwrap();
        let url = client.url_for(&UpstreamRequest::new("/genre/movie/list")).unwrap();

        assert_eq!(url.path(), "/tmdb/3/genre/movie/list");
    }

    #[test]
    fn test_append_to_response_joins_with_commas() {
        let request = UpstreamRequest::new("movie/550")
            .append_to_response(&["keywords", "credits", "images", "videos"]);

        assert_eq!(
            request.params(),
            &[(
                "append_to_response".to_string(),
                "keywords,credits,images,videos".to_string()
            )]
        );
    }

    #[test]
    fn test_missing_api_key_fails_at_construction() {
        let mut config = config("https://api.test.com");
        config.api_key.clear();

        assert!(UpstreamClient::new(&config).is_err());
    }

    #[test]
    fn test_missing_base_url_fails_at_construction() {
        assert!(UpstreamClient::new(&config("")).is_err());
    }
}
