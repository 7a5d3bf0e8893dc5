//! Revisioned cache keys and request keys.
//!
//! Precached resources are stored under `<url>?rev=<revision>` (or
//! `<url>&rev=<revision>` when the URL already carries a query), so two
//! revisions of one URL never share a slot.

/// Query parameter carrying the revision tag.
pub const REVISION_PARAM: &str = "rev";

/// Derive the storage key for `url` at `revision`.
pub fn revisioned_key(url: &str, revision: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{REVISION_PARAM}={revision}")
}

/// Split a stored key into its base URL and revision tag.
///
/// The revision is the last non-empty `rev` parameter, the one
/// [`revisioned_key`] appends; any earlier `rev` belongs to the URL itself.
/// Returns the key unchanged and `None` when no such parameter is present.
pub fn split_revision(key: &str) -> (String, Option<String>) {
    let Some((base, query)) = key.split_once('?') else {
        return (key.to_string(), None);
    };

    let pairs: Vec<&str> = query.split('&').collect();
    let found = pairs.iter().enumerate().rev().find_map(|(i, pair)| match pair.split_once('=') {
        Some((REVISION_PARAM, value)) if !value.is_empty() => Some((i, value)),
        _ => None,
    });
    let Some((index, revision)) = found else {
        return (key.to_string(), None);
    };

    let kept: Vec<&str> = pairs.iter().enumerate().filter(|(i, _)| *i != index).map(|(_, p)| *p).collect();
    let base_url = if kept.is_empty() { base.to_string() } else { format!("{base}?{}", kept.join("&")) };
    (base_url, Some(revision.to_string()))
}

/// Key identifying one logical request for de-duplication.
pub fn request_key(method: &str, url: &str) -> String {
    format!("{}:{url}", method.to_ascii_uppercase())
}

/// Version-qualified generation name, e.g. `revcache-v6`.
pub fn generation_name(cache_name: &str, version: &str) -> String {
    format!("{cache_name}-{version}")
}
