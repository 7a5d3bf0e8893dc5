//! Fixtures shared by controller and event tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use revcache_core::cache::{ContentVerifier, Sha256Verifier, sha256_hex};
use revcache_core::{CacheDb, CacheStore, Error, Generation, ManifestEntry, StaticManifest, StoredResponse};

use super::{ControllerConfig, ResourceController};
use crate::fetch::{Fetch, Request, RetryPolicy};

/// Serves canned bodies by URL and counts every call. Unknown URLs get 404.
#[derive(Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, (u16, &'static [u8])>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<Request>>,
    latency: Option<Duration>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self { latency: Some(latency), ..Default::default() }
    }

    pub(crate) fn route(self, url: &str, status: u16, body: &'static [u8]) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), (status, body));
        self
    }

    /// Make every fetch of `url` fail with a transport error.
    pub(crate) fn fail(self, url: &str, message: &str) -> Self {
        self.failures.lock().unwrap().insert(url.to_string(), message.to_string());
        self
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, Error> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = self.failures.lock().unwrap().get(&request.url) {
            return Err(Error::HttpError(message.clone()));
        }
        let (status, body) = self.routes.lock().unwrap().get(&request.url).copied().unwrap_or((404, &b"not found"[..]));
        Ok(StoredResponse::new(request.url.clone(), status, body).with_header("content-type", "image/png"))
    }
}

/// In-memory store whose lookups or writes can be switched to fail.
pub(crate) struct FlakyStore {
    inner: CacheDb,
    lookups_fail: AtomicBool,
    writes_fail: AtomicBool,
}

impl FlakyStore {
    pub(crate) async fn new() -> Self {
        Self {
            inner: CacheDb::open_in_memory().await.unwrap(),
            lookups_fail: AtomicBool::new(false),
            writes_fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_lookups(&self, fail: bool) {
        self.lookups_fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    fn unavailable() -> Error {
        Error::MigrationFailed("store unavailable".into())
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn lookup(&self, generation: &Generation, key: &str) -> Result<Option<StoredResponse>, Error> {
        if self.lookups_fail.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.lookup(generation, key).await
    }

    async fn write(&self, generation: &Generation, key: &str, response: &StoredResponse) -> Result<(), Error> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.write(generation, key, response).await
    }

    async fn remove(&self, generation: &Generation, key: &str) -> Result<bool, Error> {
        self.inner.remove(generation, key).await
    }

    async fn list_keys(&self, generation: &Generation) -> Result<Vec<String>, Error> {
        self.inner.list_keys(generation).await
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.inner.list_generations().await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_generation(name).await
    }
}

pub(crate) fn digest(body: &[u8]) -> String {
    sha256_hex(body)
}

pub(crate) fn entry(url: &str, revision: &str, body: &[u8]) -> ManifestEntry {
    ManifestEntry::new(url).with_revision(revision).with_hash(digest(body))
}

pub(crate) fn config(scope: &[&str]) -> ControllerConfig {
    ControllerConfig {
        cache_name: "assets".into(),
        version: "v2".into(),
        scope: scope.iter().map(|s| s.to_string()).collect(),
        retry: RetryPolicy::new(2, Duration::from_millis(100)),
    }
}

pub(crate) struct Harness {
    pub(crate) controller: Arc<ResourceController>,
    pub(crate) fetcher: Arc<MockFetcher>,
    pub(crate) store: Arc<dyn CacheStore>,
}

impl Harness {
    pub(crate) async fn new(entries: Vec<ManifestEntry>, fetcher: MockFetcher) -> Self {
        Self::with_config(config(&[]), entries, fetcher).await
    }

    pub(crate) async fn with_config(config: ControllerConfig, entries: Vec<ManifestEntry>, fetcher: MockFetcher) -> Self {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        Self::with_store(config, entries, fetcher, store)
    }

    pub(crate) fn with_store(
        config: ControllerConfig, entries: Vec<ManifestEntry>, fetcher: MockFetcher, store: Arc<dyn CacheStore>,
    ) -> Self {
        let fetcher = Arc::new(fetcher);
        let manifest = Arc::new(StaticManifest::new(entries).unwrap());
        let verifier: Arc<dyn ContentVerifier> = Arc::new(Sha256Verifier);
        let controller = Arc::new(ResourceController::new(
            config,
            manifest,
            fetcher.clone(),
            store.clone(),
            verifier,
        ));
        Self { controller, fetcher, store }
    }

    pub(crate) async fn keys(&self, generation: &str) -> Vec<String> {
        let generation = self.store.open(generation).await.unwrap();
        self.store.list_keys(&generation).await.unwrap()
    }

    pub(crate) async fn seed(&self, generation: &str, key: &str, body: &'static [u8]) {
        let generation = self.store.open(generation).await.unwrap();
        let response = StoredResponse::new(key, 200, body);
        self.store.write(&generation, key, &response).await.unwrap();
    }

    pub(crate) async fn start(&self) {
        self.controller.install().await.unwrap();
        self.controller.activate().await.unwrap();
    }
}
