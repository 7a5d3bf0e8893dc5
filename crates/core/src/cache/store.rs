//! Cache store contract and the response type it persists.

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;

/// A response as fetched from the network or read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// URL the response was produced for.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Handle to one named cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation {
    name: String,
}

impl Generation {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Persistent, generation-scoped key to response store.
///
/// A generation springs into existence on its first write; `open` only
/// hands out a handle.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a handle to the generation called `name`.
    async fn open(&self, name: &str) -> Result<Generation, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("generation name cannot be empty".into()));
        }
        Ok(Generation { name: name.to_string() })
    }

    /// Look up the response stored under `key`.
    async fn lookup(&self, generation: &Generation, key: &str) -> Result<Option<StoredResponse>, Error>;

    /// Store `response` under `key`, replacing any previous value.
    async fn write(&self, generation: &Generation, key: &str, response: &StoredResponse) -> Result<(), Error>;

    /// Remove `key`. Returns whether an entry was deleted.
    async fn remove(&self, generation: &Generation, key: &str) -> Result<bool, Error>;

    /// All keys stored in the generation, sorted.
    async fn list_keys(&self, generation: &Generation) -> Result<Vec<String>, Error>;

    /// Names of every generation that holds or held entries, sorted.
    async fn list_generations(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all of its entries. Returns whether it existed.
    async fn delete_generation(&self, name: &str) -> Result<bool, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(StoredResponse::new("https://x/a", 200, Bytes::new()).is_success());
        assert!(StoredResponse::new("https://x/a", 404, Bytes::new()).is_client_error());
        assert!(StoredResponse::new("https://x/a", 503, Bytes::new()).is_server_error());
        assert!(!StoredResponse::new("https://x/a", 304, Bytes::new()).is_success());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let resp = StoredResponse::new("https://x/a", 200, Bytes::new()).with_header("Content-Type", "font/woff2");
        assert_eq!(resp.content_type(), Some("font/woff2"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("font/woff2"));
        assert_eq!(resp.header("etag"), None);
    }
}
