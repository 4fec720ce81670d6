//! cache_get tool implementation.
//!
//! Looks a request up in the current generations without touching the network.

use harbor_client::Agent;
use harbor_core::{AgentRequest, CachePurpose, Error, Method};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or origin-relative path of the cached request.
    pub url: String,

    /// Request method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Generation to search. Both are searched, dynamic first, when omitted.
    #[serde(default)]
    pub purpose: Option<CachePurpose>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    /// Generation the entry was found in.
    pub generation: String,
    pub status: u16,
    pub headers: std::collections::BTreeMap<String, String>,
    pub body: String,
    pub body_bytes: usize,
    /// RFC 3339 timestamp of when the entry was stored.
    pub stored_at: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(agent: &Agent, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = agent.resolve(&params.url)?;
    let method = match params.method.as_deref() {
        Some(method) => method.parse::<Method>()?,
        None => Method::Get,
    };
    let request = AgentRequest::new(method, url);

    let purposes = match params.purpose {
        Some(purpose) => vec![purpose],
        None => vec![CachePurpose::Dynamic, CachePurpose::Static],
    };

    for purpose in purposes {
        let cache = agent.cache(purpose);
        if let Some(response) = cache.match_request(&request).await? {
            let output = CacheGetOutput {
                url: request.url.to_string(),
                generation: cache.name().to_string(),
                status: response.status,
                body: response.body_text(),
                body_bytes: response.body.len(),
                stored_at: response.stored_at.map(|at| at.to_rfc3339()),
                headers: response.headers,
            };
            return json_result(&output);
        }
    }

    Err(Error::CacheMiss(format!("{} {}", request.method, request.url)).into())
}
