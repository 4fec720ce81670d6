//! sync_register and agent_sync tool implementations.

use harbor_client::{Agent, SyncOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the sync tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncTagParams {
    /// Deferred task tag, e.g. `message-send`.
    pub tag: String,

    /// agent_sync only: wait for the routine and report its outcome.
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    pub tag: String,
    /// Present when the caller waited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SyncOutcome>,
    pub pending: usize,
}

fn tag(params: &SyncTagParams) -> Result<&str, ToolError> {
    let tag = params.tag.trim();
    if tag.is_empty() {
        return Err(ToolError::InvalidInput("tag must not be empty".into()));
    }
    Ok(tag)
}

pub async fn register_impl(agent: &Agent, params: SyncTagParams) -> Result<CallToolResult, McpError> {
    let tag = tag(&params)?;
    let task = agent.sync_register(tag);
    json_result(&task)
}

/// Resync signal. Dispatched in the background unless `wait` is set.
pub async fn sync_impl(agent: &Agent, params: SyncTagParams) -> Result<CallToolResult, McpError> {
    let tag = tag(&params)?;
    let outcome = if params.wait {
        Some(agent.sync_now(tag).await)
    } else {
        agent.sync(tag);
        None
    };

    json_result(&SyncOutput { tag: tag.to_string(), outcome, pending: agent.pending_sync().len() })
}
