//! Request and response values seen by the agent.
//!
//! These carry only what the classifier and executors look at: method, URL,
//! navigation flag on the way in; status, headers and body on the way out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Status used by every synthesized offline response.
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method may be intercepted and cached.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// An outbound request handed to the agent by the client application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub method: Method,
    pub url: Url,
    /// Top-level document load.
    pub navigation: bool,
}

impl AgentRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, navigation: false }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn navigate(url: Url) -> Self {
        Self { method: Method::Get, url, navigation: true }
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A response produced by the network, the cache, or the offline responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub status: u16,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    /// Set when the response was read back from a cache generation.
    #[serde(default)]
    pub stored_at: Option<DateTime<Utc>>,
}

impl AgentResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: BTreeMap::new(), body: body.into(), stored_at: None }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// A `text/plain` response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into()).with_header("content-type", "text/plain; charset=utf-8")
    }

    /// An `application/json` response.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string()).with_header("content-type", "application/json")
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" POST ".parse::<Method>().unwrap(), Method::Post);
        assert!(matches!("BREW".parse::<Method>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_only_get_is_retrieval() {
        assert!(Method::Get.is_retrieval());
        assert!(!Method::Head.is_retrieval());
        assert!(!Method::Post.is_retrieval());
        assert!(!Method::Delete.is_retrieval());
    }

    #[test]
    fn test_success_range() {
        assert!(AgentResponse::new(200, "").is_success());
        assert!(AgentResponse::new(204, "").is_success());
        assert!(!AgentResponse::new(304, "").is_success());
        assert!(!AgentResponse::new(404, "").is_success());
        assert!(!AgentResponse::new(503, "").is_success());
    }

    #[test]
    fn test_headers_case_insensitive() {
        let response = AgentResponse::text(200, "hi");
        assert_eq!(response.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(response.body_text(), "hi");
    }

    #[test]
    fn test_json_response() {
        let response = AgentResponse::json(503, &serde_json::json!({ "success": false }));
        assert_eq!(response.content_type(), Some("application/json"));
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value["success"], false);
    }
}
