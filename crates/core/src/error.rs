//! Unified error types for harbor.
//!
//! Display strings carry a stable code prefix so hosts can match on them
//! without depending on the enum.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the harbor agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The named cache generation has not been opened.
    #[error("CACHE_ERROR: unknown generation {0}")]
    UnknownGeneration(String),

    /// Only successful responses may be stored.
    #[error("UNCACHEABLE: status {0}")]
    Uncacheable(u16),

    /// Transport-level failure (connect, reset, timeout).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Lifecycle event arrived in a state that does not accept it.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),

    /// Precaching the install manifest failed.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// A deferred resync routine failed.
    #[error("SYNC_FAILED: {0}")]
    SyncFailed(String),

    /// Host capability (notifications, views) failed.
    #[error("HOST_ERROR: {0}")]
    Host(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::UnknownGeneration(name) => (-32002, format!("unknown generation {name}")),
            Error::Uncacheable(status) => (-32002, format!("status {status} is not cacheable")),
            Error::Network(msg) => (-32008, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::Lifecycle(msg) => (-32013, msg.clone()),
            Error::InstallFailed(msg) => (-32014, msg.clone()),
            Error::SyncFailed(msg) => (-32015, msg.clone()),
            Error::Host(msg) => (-32016, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("GET https://example.com/".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("https://example.com/"));
    }

    #[test]
    fn test_uncacheable_display() {
        assert_eq!(Error::Uncacheable(404).to_string(), "UNCACHEABLE: status 404");
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::Lifecycle("not installed".into()).into();
        assert_eq!(mcp_err.code.0, -32013);
    }
}
