//! URL canonicalization so manifest URLs, request URLs and cache keys agree.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("missing scheme: {0}")]
    MissingScheme(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute http(s) URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase scheme and host, drop default ports
/// 3. Ensure a path (`https://x` becomes `https://x/`)
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder), so `rev` parameters survive
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if !trimmed.contains("://") {
        return Err(UrlError::MissingScheme(trimmed.to_string()));
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Canonical form of `input` as a string, the shape used for cache keys.
pub fn canonical_string(input: &str) -> Result<String, UrlError> {
    canonicalize(input).map(String::from)
}

impl From<UrlError> for revcache_core::Error {
    fn from(err: UrlError) -> Self {
        revcache_core::Error::InvalidUrl(err.to_string())
    }
}
