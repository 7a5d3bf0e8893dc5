//! resource_fetch tool implementation.
//!
//! Hands a request to the controller as an intercepted fetch.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use revcache_client::{ControllerEvent, EventOutcome, Request, ResourceController, ResponseSource, dispatch};
use revcache_core::{Error, StoredResponse, cache::sha256_hex};

use super::json_result;

/// Input parameters for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// The URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET is answered from the cache.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchDisposition {
    /// The controller answered the request.
    Responded,
    /// Outside scope or controller not active; the caller should go to the network.
    Passthrough,
}

/// Output structure for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ResourceFetchOutput {
    pub url: String,
    pub disposition: FetchDisposition,
    /// Where the response came from.
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub size: Option<usize>,
    /// Hex SHA-256 of the body.
    pub sha256: Option<String>,
    /// Body as text, only for textual content types.
    pub text: Option<String>,
}

impl ResourceFetchOutput {
    fn passthrough(url: String) -> Self {
        Self {
            url,
            disposition: FetchDisposition::Passthrough,
            source: None,
            status: None,
            content_type: None,
            size: None,
            sha256: None,
            text: None,
        }
    }

    fn responded(url: String, source: ResponseSource, response: &StoredResponse) -> Self {
        let content_type = response.content_type().map(str::to_string);
        let text = content_type
            .as_deref()
            .filter(|ct| is_textual(ct))
            .map(|_| String::from_utf8_lossy(&response.body).into_owned());
        Self {
            url,
            disposition: FetchDisposition::Responded,
            source: Some(source),
            status: Some(response.status),
            content_type,
            size: Some(response.body.len()),
            sha256: Some(sha256_hex(&response.body)),
            text,
        }
    }
}

fn is_textual(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/") || ct.contains("json") || ct.contains("javascript") || ct.contains("xml")
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(
    controller: &ResourceController, params: ResourceFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = Request::new(&params.method, params.url.clone());
    let output = match dispatch(controller, ControllerEvent::Fetch(request)).await? {
        EventOutcome::Responded(served) => ResourceFetchOutput::responded(params.url, served.source, &served.response),
        _ => ResourceFetchOutput::passthrough(params.url),
    };

    json_result(&output)
}
