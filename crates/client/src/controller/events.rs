//! Host events and how the controller answers them.
//!
//! The host delivers four kinds of event: install, activate, intercepted
//! fetches and free-form messages. Only `{"type": "PRECACHE_RESOURCES"}` is
//! understood as a message; anything else is ignored.

use serde::Deserialize;
use serde_json::Value;

use revcache_core::Error;

use super::{ActivationReport, PrecacheReport, ResourceController, Served};
use crate::fetch::Request;

/// Something the host asks the controller to handle.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(Value),
}

/// Messages the controller acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "PRECACHE_RESOURCES")]
    PrecacheResources,
}

impl ControlMessage {
    /// Recognize a message payload, `None` for anything unknown.
    pub fn parse(payload: &Value) -> Option<Self> {
        Self::deserialize(payload).ok()
    }
}

/// What handling an event produced.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed,
    Activated(ActivationReport),
    /// The controller answered an intercepted request.
    Responded(Served),
    /// Not ours: the host should perform the request itself.
    Passthrough,
    Refreshed(PrecacheReport),
    Ignored,
}

/// Route one host event to the matching controller operation.
///
/// Fetches are only answered once the controller is active and the URL is in
/// scope; before that they pass through untouched.
pub async fn dispatch(controller: &ResourceController, event: ControllerEvent) -> Result<EventOutcome, Error> {
    match event {
        ControllerEvent::Install => {
            controller.install().await?;
            Ok(EventOutcome::Installed)
        }
        ControllerEvent::Activate => controller.activate().await.map(EventOutcome::Activated),
        ControllerEvent::Fetch(request) => {
            if !controller.controls(&request.url).await {
                tracing::trace!(url = %request.url, "not controlled, passing through");
                return Ok(EventOutcome::Passthrough);
            }
            controller.handle_fetch(&request).await.map(EventOutcome::Responded)
        }
        ControllerEvent::Message(payload) => match ControlMessage::parse(&payload) {
            Some(ControlMessage::PrecacheResources) => controller.refresh().await.map(EventOutcome::Refreshed),
            None => {
                tracing::debug!(%payload, "ignoring unrecognized message");
                Ok(EventOutcome::Ignored)
            }
        },
    }
}
