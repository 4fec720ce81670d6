//! Terminal fallback for requests whose strategy gave up.
//!
//! Never fails. Navigations get the cached root document when one exists;
//! API requests get a structured JSON body; everything else gets plain text.
//! All synthesized responses carry a 503 status and are never cached.

use harbor_core::AgentResponse;
use harbor_core::http::SERVICE_UNAVAILABLE;
use serde_json::json;

pub const OFFLINE_API_MESSAGE: &str = "You are offline. This action will be retried when connectivity returns.";
pub const OFFLINE_TEXT: &str = "Offline. Check your connection and try again.";

/// The kind of request that fell through, as far as the fallback cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Navigation,
    Api,
    Other,
}

/// Produce the offline response. `root` is the cached root document, if any.
pub fn respond(kind: FallbackKind, root: Option<AgentResponse>) -> AgentResponse {
    match (kind, root) {
        (FallbackKind::Navigation, Some(root)) => root,
        (FallbackKind::Api, _) => api_unavailable(),
        _ => text_unavailable(),
    }
}

pub fn api_unavailable() -> AgentResponse {
    let body = json!({
        "success": false,
        "offline": true,
        "message": OFFLINE_API_MESSAGE,
    });
    AgentResponse::json(SERVICE_UNAVAILABLE, &body)
}

pub fn text_unavailable() -> AgentResponse {
    AgentResponse::text(SERVICE_UNAVAILABLE, OFFLINE_TEXT)
}
