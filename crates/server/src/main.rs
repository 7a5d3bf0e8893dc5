//! revcache server entry point.
//!
//! Loads configuration, opens the cache, runs install and activate, then
//! serves the controller over MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use revcache_client::{
    ControllerConfig, ControllerEvent, FetchConfig, HttpFetcher, ResourceController, dispatch,
};
use revcache_core::cache::Sha256Verifier;
use revcache_core::{AppConfig, CacheDb};

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let manifest = config.manifest()?;
    tracing::info!(
        generation = %config.generation_name(),
        db = %config.db_path.display(),
        resources = manifest.len(),
        "starting revcache server on stdio transport"
    );

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(&config))?);
    let controller = Arc::new(ResourceController::new(
        ControllerConfig::from_app_config(&config),
        Arc::new(manifest),
        fetcher,
        store.clone(),
        Arc::new(Sha256Verifier),
    ));

    dispatch(&controller, ControllerEvent::Install).await?;
    dispatch(&controller, ControllerEvent::Activate).await?;

    let handler = handler::McpCacheServer::new(controller, store);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
