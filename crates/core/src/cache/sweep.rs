//! Reconcile the cache against the current manifest.
//!
//! Runs once per activation. Stale generations are dropped wholesale, then
//! every key in the current generation that no longer pairs with a manifest
//! URL and revision is removed.

use std::collections::HashSet;

use serde::Serialize;

use super::key::split_revision;
use super::store::CacheStore;
use crate::Error;
use crate::manifest::ManifestEntry;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SweepReport {
    /// Generation names deleted because a newer one is current.
    pub generations_deleted: Vec<String>,
    /// Entries removed from the current generation.
    pub entries_removed: usize,
}

/// Delete stale generations of `cache_name` and stale entries of `current`.
///
/// # Errors
///
/// Propagates any store failure; a partially applied sweep is safe to rerun.
pub async fn sweep(
    store: &dyn CacheStore, cache_name: &str, current: &str, manifest: &[ManifestEntry],
) -> Result<SweepReport, Error> {
    let mut report = SweepReport::default();
    let prefix = format!("{cache_name}-");

    for name in store.list_generations().await? {
        if name.starts_with(&prefix) && name != current && store.delete_generation(&name).await? {
            tracing::info!(generation = %name, "deleted stale cache generation");
            report.generations_deleted.push(name);
        }
    }

    let generation = store.open(current).await?;
    let revisions: HashSet<&str> = manifest.iter().filter_map(|e| e.revision.as_deref()).collect();
    let urls: HashSet<&str> = manifest.iter().map(|e| e.url.as_str()).collect();

    for key in store.list_keys(&generation).await? {
        let (base_url, revision) = split_revision(&key);
        let stale = match revision.as_deref() {
            None => true,
            Some(rev) => !revisions.contains(rev) || !urls.contains(base_url.as_str()),
        };

        if stale && store.remove(&generation, &key).await? {
            tracing::debug!(key = %key, "removed stale cache entry");
            report.entries_removed += 1;
        }
    }

    tracing::info!(
        generations = report.generations_deleted.len(),
        entries = report.entries_removed,
        "cache sweep complete"
    );

    Ok(report)
}
