//! agent_push and agent_notification_click tool implementations.

use harbor_client::Agent;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::host::HeadlessNotifications;
use crate::tools::json_result;

/// Parameters for the agent_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentPushParams {
    /// Raw push payload. JSON with title, body, url, icon, badge and tag
    /// fields is recognised; anything else shows the configured defaults.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the agent_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Id returned by agent_push.
    pub id: String,
}

pub async fn push_impl(agent: &Agent, params: AgentPushParams) -> Result<CallToolResult, McpError> {
    let shown = agent.push(params.payload.as_deref().map(str::as_bytes)).await?;
    json_result(&shown)
}

pub async fn click_impl(
    agent: &Agent, notifications: &HeadlessNotifications, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let shown = notifications
        .get(&params.id)?
        .ok_or_else(|| ToolError::UnknownNotification(params.id.clone()))?;
    let outcome = agent.notification_click(&shown).await?;
    json_result(&outcome)
}
