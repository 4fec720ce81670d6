//! agent_install, agent_activate and agent_status tool implementations.

use harbor_client::Agent;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use crate::tools::json_result;

/// Precache the manifest and activate. Leaves the agent redundant on failure.
pub async fn install_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    let report = agent.install().await?;
    json_result(&report)
}

pub async fn activate_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    let report = agent.activate().await?;
    json_result(&report)
}

pub async fn status_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    json_result(&agent.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fixtures::{fixture, output};

    #[tokio::test]
    async fn test_install_activate_status() {
        let f = fixture().await;

        let installed = output(&install_impl(&f.agent).await.unwrap());
        assert_eq!(installed["generation"], "harbor-static-v1");
        assert_eq!(installed["precached"].as_array().unwrap().len(), 2);
        assert!(installed["activated"].is_object());
        assert_eq!(output(&status_impl(&f.agent).await.unwrap())["state"], "active");

        let activated = output(&activate_impl(&f.agent).await.unwrap());
        assert!(activated["deleted"].as_array().unwrap().is_empty());

        let status = output(&status_impl(&f.agent).await.unwrap());
        assert_eq!(status["state"], "active");
        assert_eq!(status["generations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let f = fixture().await;
        f.transport.set_offline(true);

        let err = install_impl(&f.agent).await.unwrap_err();
        assert_eq!(err.code.0, -32014);

        let status = output(&status_impl(&f.agent).await.unwrap());
        assert_eq!(status["state"], "redundant");
    }

    #[tokio::test]
    async fn test_activate_before_install_fails() {
        let f = fixture().await;
        let err = activate_impl(&f.agent).await.unwrap_err();
        assert_eq!(err.code.0, -32013);
    }
}
