//! Structured errors for the harbor-agent server.
//!
//! Agent and cache failures arrive as `harbor_core::Error`; these cover
//! what only the tool surface can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., no purge selector).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Click on a notification this server never showed or already closed.
    #[error("UNKNOWN_NOTIFICATION: {0}")]
    UnknownNotification(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::UnknownNotification(id) => (-32017, format!("unknown notification {id}")),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidInput("empty".into()).into();
        assert_eq!(err.code.0, -32602);

        let err: McpError = ToolError::UnknownNotification("n-9".into()).into();
        assert_eq!(err.code.0, -32017);
        assert!(err.message.contains("n-9"));
    }

    #[test]
    fn test_display_carries_code() {
        assert!(ToolError::UnknownNotification("n-1".into()).to_string().starts_with("UNKNOWN_NOTIFICATION"));
    }
}
