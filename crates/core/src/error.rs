//! Unified error types for revcache.
//!
//! Every variant renders as `CODE: detail` so log lines and MCP error
//! messages stay greppable.

use std::sync::Arc;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the resource cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Manifest could not be loaded or contains invalid entries.
    #[error("INVALID_MANIFEST: {0}")]
    InvalidManifest(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Transport failure or server error status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// All retry attempts for a URL failed.
    #[error("FETCH_RETRIES_EXHAUSTED: {url} failed after {retries} retries: {source}")]
    RetriesExhausted { url: String, retries: u32, source: Box<Error> },

    /// Downloaded bytes do not match the manifest digest.
    #[error("INTEGRITY_MISMATCH: {url} digest {actual} != {expected}")]
    IntegrityMismatch { url: String, expected: String, actual: String },

    /// Lifecycle operation invoked in the wrong state.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),

    /// Failure observed by every caller sharing one in-flight request.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    /// Numeric code used on the MCP wire.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::InvalidManifest(_) => -32013,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::HttpError(_) => -32008,
            Error::RetriesExhausted { .. } => -32014,
            Error::IntegrityMismatch { .. } => -32015,
            Error::Lifecycle(_) => -32016,
            Error::Shared(inner) => inner.code(),
        }
    }

    /// Whether a fetch failing with this error may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::FetchTimeout(_) | Error::HttpError(_) => true,
            Error::Shared(inner) => inner.is_transient(),
            _ => false,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        McpError { code: ErrorCode(err.code()), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidUrl("ftp://nope".to_string());
        assert!(err.to_string().contains("INVALID_URL"));
        assert!(err.to_string().contains("ftp://nope"));
    }

    #[test]
    fn test_retries_exhausted_names_url_and_count() {
        let err = Error::RetriesExhausted {
            url: "https://cdn.example.com/a.woff2".to_string(),
            retries: 3,
            source: Box::new(Error::HttpError("status 503".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://cdn.example.com/a.woff2"));
        assert!(msg.contains("3 retries"));
        assert!(msg.contains("status 503"));
    }

    #[test]
    fn test_shared_error_is_transparent() {
        let inner = Arc::new(Error::HttpError("network error: reset".to_string()));
        let err = Error::Shared(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.code(), -32008);
        assert!(err.is_transient());
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::Lifecycle("activation already in progress".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32016);
    }
}
