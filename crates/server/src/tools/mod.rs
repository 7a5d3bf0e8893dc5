//! MCP tool implementations.
//!
//! This module contains all tools exposed by the revcache server.

pub mod cache;
pub mod controller_status;
pub mod resource_fetch;
pub mod resource_precache;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use revcache_core::Error;

/// Render `output` as the pretty JSON text of a successful tool result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
