//! cache_keys tool implementation.
//!
//! Lists the keys stored in one generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use revcache_core::CacheStore;

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Generation to list (default: the current one).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub generation: String,
    pub keys: Vec<String>,
    /// Every generation present in the store.
    pub generations: Vec<String>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(
    store: &dyn CacheStore, current: &str, params: CacheKeysParams,
) -> Result<CallToolResult, McpError> {
    let name = params.generation.unwrap_or_else(|| current.to_string());
    let generation = store.open(&name).await?;
    let keys = store.list_keys(&generation).await?;
    let generations = store.list_generations().await?;

    json_result(&CacheKeysOutput { generation: name, keys, generations })
}
