//! MCP tool implementations.
//!
//! This module contains all tools exposed by the harbor-agent server. Each
//! tool returns its output as pretty-printed JSON text content.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod sync;

use harbor_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use cache::{CacheGetParams, CachePurgeParams};
pub use fetch::AgentFetchParams;
pub use notify::{AgentPushParams, NotificationClickParams};
pub use sync::SyncTagParams;

/// Serialize a tool output into a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use harbor_client::{Agent, Host, Transport};
    use harbor_core::{AgentRequest, AgentResponse, AppConfig, CacheDb, Error};
    use rmcp::model::CallToolResult;

    use crate::host::{HeadlessNotifications, ViewRegistry};

    /// Answers 200 with the request path as body, or fails when offline.
    #[derive(Default)]
    pub struct EchoTransport {
        pub offline: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Transport for EchoTransport {
        async fn fetch(&self, request: &AgentRequest) -> Result<AgentResponse, Error> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Network("network unreachable".into()));
            }
            Ok(AgentResponse::text(200, request.path()))
        }
    }

    impl EchoTransport {
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    pub struct Fixture {
        pub agent: Arc<Agent>,
        pub transport: Arc<EchoTransport>,
        pub notifications: Arc<HeadlessNotifications>,
        pub views: Arc<ViewRegistry>,
    }

    pub async fn fixture() -> Fixture {
        let transport = Arc::new(EchoTransport::default());
        let notifications = Arc::new(HeadlessNotifications::default());
        let views = Arc::new(ViewRegistry::default());
        let config = AppConfig {
            origin: "https://app.test".into(),
            precache: vec!["/".into(), "/login".into()],
            ..AppConfig::default()
        };
        let host = Host {
            storage: Arc::new(CacheDb::open_in_memory().await.unwrap()),
            transport: transport.clone(),
            notifications: notifications.clone(),
            views: views.clone(),
        };
        let agent = Arc::new(Agent::new(&config, host).unwrap());
        Fixture { agent, transport, notifications, views }
    }

    pub async fn active_fixture() -> Fixture {
        let f = fixture().await;
        f.agent.install().await.unwrap();
        f
    }

    pub fn output(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
