//! cache_purge tool implementation.
//!
//! Evicts one entry, trims to a size, or clears the current generations.

use harbor_client::Agent;
use harbor_core::{AgentRequest, CachePurpose};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Generation to purge. Both when omitted.
    #[serde(default)]
    pub purpose: Option<CachePurpose>,

    /// Evict the GET entry for this URL or origin-relative path.
    #[serde(default)]
    pub url: Option<String>,

    /// Keep only the newest N entries.
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Remove every entry.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(agent: &Agent, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.url.is_none() && params.max_entries.is_none() && !params.all {
        return Err(ToolError::InvalidInput("At least one of url, max_entries, or all must be specified".into()).into());
    }

    let request = params.url.as_deref().map(|url| agent.resolve(url).map(AgentRequest::get)).transpose()?;
    let purposes = match params.purpose {
        Some(purpose) => vec![purpose],
        None => vec![CachePurpose::Static, CachePurpose::Dynamic],
    };

    let mut deleted_total = 0u64;
    for purpose in purposes {
        let cache = agent.cache(purpose);

        if let Some(request) = &request
            && cache.delete(request).await?
        {
            deleted_total += 1;
        }

        if let Some(max_entries) = params.max_entries {
            deleted_total += cache.trim(max_entries).await?;
        }

        if params.all {
            deleted_total += cache.clear().await?;
        }
    }

    tracing::info!(deleted = deleted_total, "cache purged");
    json_result(&CachePurgeOutput { deleted: deleted_total })
}
