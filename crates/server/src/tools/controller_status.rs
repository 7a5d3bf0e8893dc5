//! controller_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use revcache_client::ResourceController;

use super::json_result;

pub async fn status_impl(controller: &ResourceController) -> Result<CallToolResult, McpError> {
    json_result(&controller.status().await)
}
