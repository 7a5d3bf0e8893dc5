//! resource_precache tool implementation.
//!
//! Delivers a `PRECACHE_RESOURCES` message to the controller.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

use revcache_client::{ControllerEvent, EventOutcome, ResourceController, dispatch};

use super::json_result;

/// Implementation of the resource_precache tool.
pub async fn precache_impl(controller: &ResourceController) -> Result<CallToolResult, McpError> {
    let message = ControllerEvent::Message(json!({ "type": "PRECACHE_RESOURCES" }));
    match dispatch(controller, message).await? {
        EventOutcome::Refreshed(report) => json_result(&report),
        other => Err(McpError::internal_error(format!("unexpected outcome: {other:?}"), None)),
    }
}
