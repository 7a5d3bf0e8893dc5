//! Offline resource cache controller.
//!
//! Lifecycle: `Installing -> Activating -> Active`.
//!
//! Activation indexes the manifest, precaches every entry that carries a
//! revision and hash (one at a time, verified before writing), sweeps stale
//! generations and entries, and finally claims clients. Once active,
//! intercepted requests resolve through the single-flight map to the cache
//! (exact key, then revisioned key) and fall back to one live fetch.

pub mod events;
pub mod single_flight;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use revcache_core::cache::{ContentVerifier, SweepReport, generation_name, request_key, revisioned_key, sweep};
use revcache_core::{AppConfig, CacheStore, Error, ManifestEntry, ManifestSource, StoredResponse};

use crate::fetch::{Fetch, Request, RetryPolicy, canonical_string, fetch_with_retry};

pub use events::{ControlMessage, ControllerEvent, EventOutcome, dispatch};
pub use single_flight::SingleFlight;

/// Lifecycle position of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    Activating,
    Active,
}

/// Static settings of one deployed controller version.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Logical cache name shared by all versions.
    pub cache_name: String,
    /// Version tag; part of the generation name.
    pub version: String,
    /// URL prefixes the controller intercepts, compared in canonical form.
    /// Empty means every http(s) URL.
    pub scope: Vec<String>,
    /// Retry policy for precache fetches.
    pub retry: RetryPolicy,
}

impl ControllerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            cache_name: config.cache_name.clone(),
            version: config.cache_version.clone(),
            scope: config.scope.clone(),
            retry: RetryPolicy::from_app_config(config),
        }
    }

    pub fn generation_name(&self) -> String {
        generation_name(&self.cache_name, &self.version)
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Exact URL match in the current generation.
    Cache,
    /// Match under the manifest's revisioned key.
    RevisionedCache,
    /// Live network fetch, not written back.
    Network,
}

/// Response handed back for an intercepted request.
#[derive(Debug, Clone)]
pub struct Served {
    pub source: ResponseSource,
    pub response: StoredResponse,
}

/// Counters for one precache pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PrecacheReport {
    pub total: usize,
    /// Fetched, verified and written.
    pub cached: usize,
    /// Already present under the revisioned key.
    pub skipped: usize,
    /// Missing a revision or hash.
    pub ineligible: usize,
    /// Fetch failure, non-2xx status or digest mismatch.
    pub failed: usize,
}

/// Result of a completed activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ActivationReport {
    pub precache: PrecacheReport,
    pub sweep: SweepReport,
}

/// Point-in-time view for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ControllerStatus {
    pub state: LifecycleState,
    pub generation: String,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
    pub indexed_resources: usize,
    pub pending_requests: usize,
}

#[derive(Debug)]
struct Lifecycle {
    state: LifecycleState,
    skip_waiting: bool,
    clients_claimed: bool,
}

type ResourceIndex = Arc<RwLock<HashMap<String, ManifestEntry>>>;

/// The resource cache controller.
///
/// Build one per process and share it behind an `Arc`.
pub struct ResourceController {
    config: ControllerConfig,
    generation: String,
    scope: Vec<String>,
    manifest: Arc<dyn ManifestSource>,
    fetcher: Arc<dyn Fetch>,
    store: Arc<dyn CacheStore>,
    verifier: Arc<dyn ContentVerifier>,
    resources: ResourceIndex,
    flights: SingleFlight<Result<Served, Arc<Error>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl ResourceController {
    pub fn new(
        config: ControllerConfig, manifest: Arc<dyn ManifestSource>, fetcher: Arc<dyn Fetch>,
        store: Arc<dyn CacheStore>, verifier: Arc<dyn ContentVerifier>,
    ) -> Self {
        let generation = config.generation_name();
        let scope = canonical_scope(&config.scope);
        Self {
            config,
            generation,
            scope,
            manifest,
            fetcher,
            store,
            verifier,
            resources: Arc::new(RwLock::new(HashMap::new())),
            flights: SingleFlight::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Installing,
                skip_waiting: false,
                clients_claimed: false,
            }),
        }
    }

    /// Name of the generation this version reads and writes.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.lock().await.state
    }

    pub async fn status(&self) -> ControllerStatus {
        let lifecycle = self.lifecycle.lock().await;
        ControllerStatus {
            state: lifecycle.state,
            generation: self.generation.clone(),
            skip_waiting: lifecycle.skip_waiting,
            clients_claimed: lifecycle.clients_claimed,
            indexed_resources: self.resources.read().await.len(),
            pending_requests: self.flights.pending_count().await,
        }
    }

    /// Record the intent to take over without waiting for old clients.
    ///
    /// # Errors
    ///
    /// `Error::Lifecycle` once activation has started.
    pub async fn install(&self) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != LifecycleState::Installing {
            return Err(Error::Lifecycle(format!("cannot install while {:?}", lifecycle.state)));
        }
        lifecycle.skip_waiting = true;
        tracing::info!(generation = %self.generation, "installed; skipping wait for existing clients");
        Ok(())
    }

    /// Run the full activation sequence: index, precache, sweep, claim.
    ///
    /// # Errors
    ///
    /// `Error::Lifecycle` when activation is running or done; store failures
    /// abort the sequence and return the controller to `Installing`.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.state != LifecycleState::Installing {
                return Err(Error::Lifecycle(format!("cannot activate while {:?}", lifecycle.state)));
            }
            if !lifecycle.skip_waiting {
                tracing::warn!(generation = %self.generation, "activating without a prior install");
            }
            lifecycle.state = LifecycleState::Activating;
        }
        tracing::info!(generation = %self.generation, "activating");

        match self.run_activation().await {
            Ok(report) => {
                self.claim_clients().await;
                tracing::info!(
                    generation = %self.generation,
                    cached = report.precache.cached,
                    failed = report.precache.failed,
                    swept = report.sweep.entries_removed,
                    "activation complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.lifecycle.lock().await.state = LifecycleState::Installing;
                tracing::error!(generation = %self.generation, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    async fn run_activation(&self) -> Result<ActivationReport, Error> {
        let entries = self.index_manifest().await;
        let precache = self.precache(&entries).await?;
        let sweep = sweep(self.store.as_ref(), &self.config.cache_name, &self.generation, &entries).await?;
        Ok(ActivationReport { precache, sweep })
    }

    /// Re-run the precache pass on demand, without sweeping or claiming.
    pub async fn refresh(&self) -> Result<PrecacheReport, Error> {
        tracing::info!(generation = %self.generation, "precache refresh requested");
        let entries = self.canonical_manifest();
        self.precache(&entries).await
    }

    async fn claim_clients(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.clients_claimed = true;
        lifecycle.state = LifecycleState::Active;
        tracing::info!(generation = %self.generation, "claimed clients");
    }

    /// Manifest entries with canonical URLs.
    ///
    /// Unparseable URLs are dropped. When two entries canonicalize to the same
    /// URL the first one wins.
    fn canonical_manifest(&self) -> Vec<ManifestEntry> {
        let mut seen = HashSet::new();
        self.manifest
            .list()
            .into_iter()
            .filter_map(|mut entry| match canonical_string(&entry.url) {
                Ok(url) if !seen.insert(url.clone()) => {
                    tracing::warn!(url = %entry.url, canonical = %url, "skipping duplicate manifest entry");
                    None
                }
                Ok(url) => {
                    entry.url = url;
                    Some(entry)
                }
                Err(e) => {
                    tracing::warn!(url = %entry.url, error = %e, "skipping manifest entry with invalid url");
                    None
                }
            })
            .collect()
    }

    async fn index_manifest(&self) -> Vec<ManifestEntry> {
        let entries = self.canonical_manifest();
        let mut index = self.resources.write().await;
        index.clear();
        index.extend(entries.iter().map(|e| (e.url.clone(), e.clone())));
        tracing::debug!(resources = index.len(), "indexed manifest");
        entries
    }

    /// Fetch, verify and store every precachable entry, one at a time.
    async fn precache(&self, entries: &[ManifestEntry]) -> Result<PrecacheReport, Error> {
        let generation = self.store.open(&self.generation).await?;
        let mut report = PrecacheReport { total: entries.len(), ..Default::default() };

        for (i, entry) in entries.iter().enumerate() {
            let (Some(revision), Some(expected)) = (entry.revision.as_deref(), entry.hash.as_deref())
            else {
                report.ineligible += 1;
                continue;
            };
            if !entry.is_precachable() {
                tracing::debug!(url = %entry.url, "blank revision or hash, not precaching");
                report.ineligible += 1;
                continue;
            }

            let key = revisioned_key(&entry.url, revision);
            if self.store.lookup(&generation, &key).await?.is_some() {
                tracing::debug!(key = %key, "already cached, skipping");
                report.skipped += 1;
                continue;
            }

            tracing::debug!(key = %key, index = i + 1, total = entries.len(), "precaching");
            match self.fetch_verified(&key, expected).await {
                Ok(response) => {
                    self.store.write(&generation, &key, &response).await?;
                    tracing::info!(key = %key, bytes = response.body.len(), "precached (digest verified)");
                    report.cached += 1;
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "precache failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            total = report.total,
            cached = report.cached,
            skipped = report.skipped,
            ineligible = report.ineligible,
            failed = report.failed,
            "precache pass complete"
        );
        Ok(report)
    }

    async fn fetch_verified(&self, key: &str, expected: &str) -> Result<StoredResponse, Error> {
        let response = fetch_with_retry(self.fetcher.as_ref(), &Request::get(key), self.config.retry).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("status {}", response.status)));
        }
        if !self.verifier.verify(&response.body, expected) {
            return Err(Error::IntegrityMismatch {
                url: key.to_string(),
                expected: expected.to_string(),
                actual: self.verifier.digest(&response.body),
            });
        }
        Ok(response)
    }

    /// Whether `url` is an http(s) URL inside the configured scope.
    pub fn in_scope(&self, url: &str) -> bool {
        let Ok(url) = canonical_string(url) else {
            return false;
        };
        self.scope.is_empty() || self.scope.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }

    /// Whether an intercepted request for `url` is ours to answer.
    pub async fn controls(&self, url: &str) -> bool {
        self.state().await == LifecycleState::Active && self.in_scope(url)
    }

    /// Answer an intercepted request from cache or network.
    ///
    /// Concurrent calls for the same method and URL share one resolution.
    ///
    /// # Errors
    ///
    /// Store failures and live fetch failures propagate; when several callers
    /// shared the failing resolution each receives `Error::Shared`.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, Error> {
        let request = Request::new(&request.method, canonical_string(&request.url)?);
        let key = request_key(&request.method, &request.url);
        let resolver = Resolver {
            generation: self.generation.clone(),
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            resources: Arc::clone(&self.resources),
        };

        self.flights
            .run(&key, move || async move { resolver.resolve(request).await.map_err(Arc::new) })
            .await
            .map_err(|e| Arc::try_unwrap(e).unwrap_or_else(Error::Shared))
    }
}

/// Scope prefixes in the same canonical form as request URLs.
fn canonical_scope(scope: &[String]) -> Vec<String> {
    scope
        .iter()
        .map(|prefix| match canonical_string(prefix) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::warn!(prefix = %prefix, error = %e, "scope prefix is not a URL, matching it verbatim");
                prefix.clone()
            }
        })
        .collect()
}

/// Owned handles needed to resolve one request off the controller's borrow.
struct Resolver {
    generation: String,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetch>,
    resources: ResourceIndex,
}

impl Resolver {
    async fn resolve(self, request: Request) -> Result<Served, Error> {
        if request.is_cacheable_method() {
            let generation = self.store.open(&self.generation).await?;

            if let Some(response) = self.store.lookup(&generation, &request.url).await? {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok(Served { source: ResponseSource::Cache, response });
            }

            let revision = self
                .resources
                .read()
                .await
                .get(&request.url)
                .and_then(|entry| entry.revision.clone())
                .filter(|rev| !rev.is_empty());

            if let Some(revision) = revision {
                let key = revisioned_key(&request.url, &revision);
                if let Some(response) = self.store.lookup(&generation, &key).await? {
                    tracing::debug!(key = %key, "revisioned cache hit");
                    return Ok(Served { source: ResponseSource::RevisionedCache, response });
                }
            }
        }

        tracing::debug!(method = %request.method, url = %request.url, "cache miss, fetching");
        let response = self.fetcher.fetch(&request).await?;
        Ok(Served { source: ResponseSource::Network, response })
    }
}
