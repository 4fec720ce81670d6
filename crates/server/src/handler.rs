//! MCP server handler implementation.
//!
//! Each host event of the agent is exposed as one tool, plus a few
//! diagnostic cache tools.

use std::sync::Arc;

use harbor_client::{Agent, Transport};
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

use crate::host::HeadlessNotifications;
use crate::tools::{
    AgentFetchParams, AgentPushParams, CacheGetParams, CachePurgeParams, NotificationClickParams, SyncTagParams, cache,
    fetch, lifecycle, notify, sync,
};

/// The MCP server handler for harbor-agent.
#[derive(Clone)]
pub struct HarborServer {
    agent: Arc<Agent>,
    transport: Arc<dyn Transport>,
    notifications: Arc<HeadlessNotifications>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl HarborServer {
    pub fn new(agent: Arc<Agent>, transport: Arc<dyn Transport>, notifications: Arc<HeadlessNotifications>) -> Self {
        Self { agent, transport, notifications, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the agent: precache the critical-path manifest into the static generation, then activate.")]
    async fn agent_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.agent).await
    }

    #[tool(description = "Activate the agent: delete obsolete generations and claim open client views.")]
    async fn agent_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.agent).await
    }

    #[tool(description = "Report lifecycle state, cache generations, and pending deferred tasks.")]
    async fn agent_status(&self) -> Result<CallToolResult, McpError> {
        lifecycle::status_impl(&self.agent).await
    }

    /// Route a request through the agent.
    ///
    /// The response reports whether it came from the network, a cache generation,
    /// or the offline responder.
    #[tool(description = "Fetch a URL through the agent's routing and caching strategies.")]
    async fn agent_fetch(&self, params: Parameters<AgentFetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.agent, self.transport.as_ref(), params.0).await
    }

    #[tool(description = "Register a deferred task tag to resynchronize when connectivity returns.")]
    async fn sync_register(&self, params: Parameters<SyncTagParams>) -> Result<CallToolResult, McpError> {
        sync::register_impl(&self.agent, params.0).await
    }

    #[tool(description = "Signal connectivity for a deferred task tag and run its resync routine once.")]
    async fn agent_sync(&self, params: Parameters<SyncTagParams>) -> Result<CallToolResult, McpError> {
        sync::sync_impl(&self.agent, params.0).await
    }

    #[tool(description = "Deliver a push payload and display the resulting notification.")]
    async fn agent_push(&self, params: Parameters<AgentPushParams>) -> Result<CallToolResult, McpError> {
        notify::push_impl(&self.agent, params.0).await
    }

    #[tool(description = "Click a displayed notification: focus a view showing its target or open one.")]
    async fn agent_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notify::click_impl(&self.agent, &self.notifications, params.0).await
    }

    #[tool(description = "Read a cached response from the current generations without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.agent, params.0).await
    }

    #[tool(description = "Evict an entry, trim to a maximum size, or clear the current generations.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.agent, params.0).await
    }
}

impl ServerHandler for HarborServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "harbor-agent".into(),
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
