//! agent_fetch tool implementation.
//!
//! Routes a request through the agent the way a client view would. A
//! passthrough decision is honoured by sending the request straight to the
//! network.

use std::collections::BTreeMap;

use harbor_client::{Agent, FetchOutcome, Source, Transport};
use harbor_core::{AgentRequest, AgentResponse, Method};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchParams {
    /// URL or origin-relative path.
    pub url: String,

    /// Request method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Treat the request as a top-level document load.
    #[serde(default)]
    pub navigate: bool,
}

/// Output from the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchOutput {
    pub url: String,
    /// True when the agent declined to intercept.
    pub passthrough: bool,
    /// network, cache or offline.
    pub source: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub body_bytes: usize,
    pub stored_at: Option<String>,
}

fn to_output(request: &AgentRequest, response: AgentResponse, source: Source, passthrough: bool) -> AgentFetchOutput {
    let source = match source {
        Source::Network => "network",
        Source::Cache => "cache",
        Source::Offline => "offline",
    };
    AgentFetchOutput {
        url: request.url.to_string(),
        passthrough,
        source: source.into(),
        status: response.status,
        body: response.body_text(),
        body_bytes: response.body.len(),
        stored_at: response.stored_at.map(|at| at.to_rfc3339()),
        headers: response.headers,
    }
}

/// Implementation of the agent_fetch tool.
pub async fn fetch_impl(
    agent: &Agent, transport: &dyn Transport, params: AgentFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = agent.resolve(&params.url)?;
    let method = match params.method.as_deref() {
        Some(method) => method.parse::<Method>()?,
        None => Method::Get,
    };
    let mut request = AgentRequest::new(method, url);
    request.navigation = params.navigate;

    let output = match agent.fetch(&request).await {
        FetchOutcome::Responded(served) => to_output(&request, served.response, served.source, false),
        FetchOutcome::Passthrough => {
            let response = transport.fetch(&request).await?;
            to_output(&request, response, Source::Network, true)
        }
    };

    json_result(&output)
}
