//! Network side of the cache: requests, the `Fetch` seam and its reqwest
//! implementation.
//!
//! ### Status handling
//! `HttpFetcher` hands every HTTP status back as a [`StoredResponse`]; only
//! transport failures become errors. Deciding whether a status is worth a
//! retry belongs to [`retry`].
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: configurable (default 20MB)
//! - Request timeout: configurable (default 20s)

pub mod retry;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonical_string, canonicalize};
pub use retry::{RetryPolicy, fetch_with_retry};

use revcache_core::{Error, StoredResponse};

/// An outgoing request as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self { method: method.as_ref().to_ascii_uppercase(), url: url.into() }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Whether the request may be answered from the cache.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == "GET"
    }
}

/// One network round trip.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform `request` once, returning the response whatever its status.
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "revcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "revcache/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &revcache_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Fetch`] implementation.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
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
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(&request.url)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", request.method)))?;

        let response = self.http.request(method, url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", url, e))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| name.as_str() != header::SET_COOKIE.as_str())
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", url, e))
            } else {
                Error::HttpError(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(StoredResponse { url: final_url, status: status.as_u16(), headers, body: bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "revcache/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = revcache_core::AppConfig { user_agent: "probe/1".into(), timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.user_agent, "probe/1");
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_request_method_normalized() {
        let request = Request::new("post", "https://x/a");
        assert_eq!(request.method, "POST");
        assert!(!request.is_cacheable_method());
        assert!(Request::get("https://x/a").is_cacheable_method());
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        assert!(HttpFetcher::new(FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_invalid_url() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let result = fetcher.fetch(&Request::get("not a url")).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
