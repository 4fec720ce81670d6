//! Network transport used by the strategy executors.
//!
//! ### Semantics
//! - Any HTTP status is a response; only transport failures (connect, reset,
//!   timeout, oversized body) are errors.
//! - Stalls are bounded by the configured timeout.
//! - Max body bytes: 5MB (configurable).
//!
//! ### URL handling
//! - Relative targets resolve against the application origin.
//! - Fragments are dropped; only http(s) is interceptable.

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use harbor_core::{AgentRequest, AgentResponse, AppConfig, Error, Method};
use reqwest::{Client, header};

pub use url::{UrlError, is_interceptable, resolve};

/// Opaque network peer returning HTTP-like responses.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &AgentRequest) -> Result<AgentResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "harbor-agent/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "harbor-agent/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// Flatten a header map, lowercasing names and joining repeated values.
fn collect_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        out.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

/// reqwest-backed transport.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Transport for FetchClient {
    async fn fetch(&self, request: &AgentRequest) -> Result<AgentResponse, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(to_reqwest_method(request.method), request.url.as_str());
        if request.navigation {
            builder = builder.header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            );
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timed out after {}ms", self.config.timeout.as_millis()))
            } else {
                Error::Network(format!("network error: {}", e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(
            "{} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(AgentResponse { status, headers, body, stored_at: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "harbor-agent/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 1500, user_agent: "test-agent".into(), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut headers = header::HeaderMap::new();
        headers.append(header::CACHE_CONTROL, "no-cache".parse().unwrap());
        headers.append(header::CACHE_CONTROL, "no-store".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "text/html".parse().unwrap());

        let flat = collect_headers(&headers);
        assert_eq!(flat.get("cache-control").map(String::as_str), Some("no-cache, no-store"));
        assert_eq!(flat.get("content-type").map(String::as_str), Some("text/html"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() }).unwrap();
        let request = AgentRequest::get(::url::Url::parse("http://127.0.0.1:9/").unwrap());
        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
