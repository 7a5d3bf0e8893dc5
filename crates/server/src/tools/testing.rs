//! Activated controller over an in-memory cache for tool tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use revcache_client::{ControllerConfig, Fetch, Request, ResourceController, RetryPolicy};
use revcache_core::cache::{Sha256Verifier, sha256_hex};
use revcache_core::{CacheDb, Error, ManifestEntry, StaticManifest, StoredResponse};

pub(crate) const LOGO: &str = "https://cdn.test/logo.png";
pub(crate) const README: &str = "https://cdn.test/readme.txt";

struct StubFetcher;

#[async_trait]
impl Fetch for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, Error> {
        let response = match request.url.as_str() {
            "https://cdn.test/logo.png?rev=v1" => {
                StoredResponse::new(&request.url, 200, &b"png-bytes"[..]).with_header("content-type", "image/png")
            }
            README => StoredResponse::new(&request.url, 200, "hello").with_header("content-type", "text/plain"),
            _ => StoredResponse::new(&request.url, 404, "not found"),
        };
        Ok(response)
    }
}

pub(crate) async fn harness() -> (Arc<ResourceController>, Arc<CacheDb>) {
    let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let manifest = StaticManifest::new(vec![
        ManifestEntry::new(LOGO).with_revision("v1").with_hash(sha256_hex(b"png-bytes")),
        ManifestEntry::new(README),
    ])
    .unwrap();
    let config = ControllerConfig {
        cache_name: "site".into(),
        version: "v1".into(),
        scope: vec!["https://cdn.test/".into()],
        retry: RetryPolicy::new(0, Duration::from_millis(1)),
    };
    let controller = Arc::new(ResourceController::new(
        config,
        Arc::new(manifest),
        Arc::new(StubFetcher),
        store.clone(),
        Arc::new(Sha256Verifier),
    ));
    controller.install().await.unwrap();
    controller.activate().await.unwrap();
    (controller, store)
}

/// Parse the JSON text carried by the first content item.
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
