//! Declarative list of cacheable resources.
//!
//! Each entry names a URL and, optionally, the revision tag and SHA-256 hex
//! digest of its current content. Only entries carrying both are precached;
//! the rest are served from cache by exact URL match only.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// One cacheable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ManifestEntry {
    /// Canonical resource URL, unique within a manifest.
    pub url: String,

    /// Opaque version tag; changes whenever the content changes.
    #[serde(default)]
    pub revision: Option<String>,

    /// Expected hex digest of the resource bytes.
    #[serde(default, alias = "expected_hash")]
    pub hash: Option<String>,
}

impl ManifestEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), revision: None, hash: None }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// True when the entry carries both a revision and an expected hash.
    pub fn is_precachable(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.revision) && present(&self.hash)
    }
}

/// Provider of the manifest for the running deployment.
pub trait ManifestSource: Send + Sync {
    /// Entries in declaration order.
    fn list(&self) -> Vec<ManifestEntry>;
}

/// Manifest fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticManifest {
    entries: Vec<ManifestEntry>,
}

impl StaticManifest {
    /// Build a manifest, rejecting empty or duplicate URLs.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.url.trim().is_empty() {
                return Err(Error::InvalidManifest("entry with empty url".into()));
            }
            if !seen.insert(entry.url.as_str()) {
                return Err(Error::InvalidManifest(format!("duplicate url: {}", entry.url)));
            }
        }
        Ok(Self { entries })
    }

    /// Load a JSON array of `{ url, revision, hash }` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidManifest(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(raw).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        Self::new(entries)
    }

    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ManifestSource for StaticManifest {
    fn list(&self) -> Vec<ManifestEntry> {
        self.entries.clone()
    }
}
