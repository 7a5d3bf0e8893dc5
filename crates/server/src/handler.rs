//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the controller and cache store.
use std::sync::Arc;

use crate::tools::cache::{CacheKeysParams, keys_impl};
use crate::tools::controller_status::status_impl;
use crate::tools::resource_fetch::{ResourceFetchParams, fetch_impl};
use crate::tools::resource_precache::precache_impl;

use revcache_client::ResourceController;
use revcache_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for revcache.
#[derive(Clone)]
pub struct McpCacheServer {
    controller: Arc<ResourceController>,
    store: Arc<CacheDb>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl McpCacheServer {
    /// Create a handler around an activated controller.
    pub fn new(controller: Arc<ResourceController>, store: Arc<CacheDb>) -> Self {
        Self { controller, store, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Request a URL through the resource cache. Returns the response and whether it came from the cache or the network, or 'passthrough' when the URL is outside the controller's scope."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, params.0).await
    }

    /// Same path as a `PRECACHE_RESOURCES` message from a page.
    #[tool(
        description = "Re-run precaching of every manifest resource that has a revision and hash. Already cached revisions are skipped."
    )]
    async fn resource_precache(&self) -> Result<CallToolResult, McpError> {
        precache_impl(&self.controller).await
    }

    #[tool(description = "List cache keys of a generation (default: the current one) and all known generations.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.store.as_ref(), self.controller.generation(), params.0).await
    }

    #[tool(description = "Report lifecycle state, current generation, indexed resources and in-flight requests.")]
    async fn controller_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.controller).await
    }
}

impl ServerHandler for McpCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "revcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::harness;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let (controller, store) = harness().await;
        let server = McpCacheServer::new(controller, store);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, vec!["cache_keys", "controller_status", "resource_fetch", "resource_precache"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (controller, store) = harness().await;
        let info = McpCacheServer::new(controller, store).get_info();
        assert_eq!(info.server_info.name, "revcache");
    }
}
