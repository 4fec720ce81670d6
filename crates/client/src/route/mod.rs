//! Route classification.
//!
//! Maps an intercepted request to the strategy that serves it. Rules are
//! evaluated in fixed precedence order and the first match wins:
//!
//! 1. API namespace -> [`ApiPolicy`]
//! 2. Static asset (extension allowlist or asset path prefix) -> cache-first, static generation
//! 3. Navigation -> navigation strategy
//! 4. Anything else -> network-first, dynamic generation
//!
//! Non-GET requests and non-http(s) schemes are never intercepted.

pub mod api;

use std::fmt;

use harbor_core::{AgentRequest, CachePurpose};
use regex::Regex;
use url::Url;

use crate::fetch::is_interceptable;

pub use api::ApiPolicy;

/// File extensions served cache-first from the static generation.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf", "otf", "eot",
];

/// Path prefixes served cache-first from the static generation.
pub const ASSET_PREFIXES: &[&str] = &["/assets/", "/static/", "/icons/"];

/// Cache/network ordering applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from the generation if present, revalidate in the background.
    CacheFirst(CachePurpose),
    /// Network, storing successes; the generation is the fallback.
    NetworkFirst(CachePurpose),
    /// Network only, never touches a generation.
    NetworkOnly,
    /// Network-first for documents with root-document fallback.
    Navigation,
}

impl Strategy {
    /// Generation a successful network response is stored in, if any.
    pub fn stores_into(&self) -> Option<CachePurpose> {
        match self {
            Strategy::CacheFirst(purpose) | Strategy::NetworkFirst(purpose) => Some(*purpose),
            Strategy::Navigation => Some(CachePurpose::Dynamic),
            Strategy::NetworkOnly => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::CacheFirst(purpose) => write!(f, "cache-first({purpose})"),
            Strategy::NetworkFirst(purpose) => write!(f, "network-first({purpose})"),
            Strategy::NetworkOnly => f.write_str("network-only"),
            Strategy::Navigation => f.write_str("navigation"),
        }
    }
}

/// Predicate over a request URL.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Path starts with the prefix.
    PathPrefix(String),
    /// Last path segment has one of these extensions (lowercase, no dot).
    Extension(Vec<String>),
    /// Regex over the path, or over the path below the API prefix for [`ApiPolicy`] rules.
    Pattern(Regex),
}

impl Matcher {
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            Matcher::PathPrefix(prefix) => path.starts_with(prefix.as_str()),
            Matcher::Extension(extensions) => extension(path).is_some_and(|ext| extensions.iter().any(|e| *e == ext)),
            Matcher::Pattern(re) => re.is_match(path),
        }
    }
}

fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// An ordered rule: matcher plus the strategy it selects.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pub matcher: Matcher,
    pub strategy: Strategy,
}

impl RoutePattern {
    pub fn new(matcher: Matcher, strategy: Strategy) -> Self {
        Self { matcher, strategy }
    }

    /// A regex rule.
    pub fn pattern(re: &str, strategy: Strategy) -> Result<Self, regex::Error> {
        Ok(Self::new(Matcher::Pattern(Regex::new(re)?), strategy))
    }
}

/// First matching rule's strategy.
fn first_match(rules: &[RoutePattern], path: &str) -> Option<Strategy> {
    rules
        .iter()
        .find(|rule| rule.matcher.matches_path(path))
        .map(|rule| rule.strategy)
}

/// The route classifier.
#[derive(Debug, Clone)]
pub struct Router {
    api_prefix: String,
    api: ApiPolicy,
    assets: Vec<RoutePattern>,
}

impl Router {
    /// Standard asset rules and API sub-policy under `api_prefix` (e.g. `/api/`).
    pub fn new(api_prefix: &str) -> Self {
        let static_first = Strategy::CacheFirst(CachePurpose::Static);
        let mut assets = vec![RoutePattern::new(
            Matcher::Extension(ASSET_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
            static_first,
        )];
        assets.extend(
            ASSET_PREFIXES
                .iter()
                .map(|prefix| RoutePattern::new(Matcher::PathPrefix(prefix.to_string()), static_first)),
        );

        Self { api_prefix: api_prefix.to_string(), api: ApiPolicy::standard(), assets }
    }

    /// Path lies in the remote API namespace.
    pub fn is_api(&self, url: &Url) -> bool {
        self.api_path(url).is_some()
    }

    /// Path below the API prefix, e.g. `stats/dashboard`.
    fn api_path<'u>(&self, url: &'u Url) -> Option<&'u str> {
        let path = url.path();
        if path == self.api_prefix.trim_end_matches('/') {
            return Some("");
        }
        path.strip_prefix(self.api_prefix.as_str())
    }

    /// Pick the strategy for a request.
    ///
    /// Returns None when the request must pass through untouched: any
    /// method other than GET, or a scheme other than http(s).
    pub fn classify(&self, request: &AgentRequest) -> Option<Strategy> {
        if !request.method.is_retrieval() || !is_interceptable(&request.url) {
            return None;
        }

        if let Some(api_path) = self.api_path(&request.url) {
            return Some(self.api.classify(api_path));
        }

        if let Some(strategy) = first_match(&self.assets, request.path()) {
            return Some(strategy);
        }

        if request.navigation {
            return Some(Strategy::Navigation);
        }

        Some(Strategy::NetworkFirst(CachePurpose::Dynamic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::Method;

    fn router() -> Router {
        Router::new("/api/")
    }

    fn get(path: &str) -> AgentRequest {
        AgentRequest::get(Url::parse("https://app.test").unwrap().join(path).unwrap())
    }

    #[test]
    fn test_stores_into() {
        assert_eq!(Strategy::CacheFirst(CachePurpose::Static).stores_into(), Some(CachePurpose::Static));
        assert_eq!(Strategy::Navigation.stores_into(), Some(CachePurpose::Dynamic));
        assert_eq!(Strategy::NetworkOnly.stores_into(), None);
    }

    #[test]
    fn test_static_assets_by_extension() {
        for path in ["/styles/main.css", "/bundle.js", "/img/Photo.JPG", "/fonts/inter.woff2", "/favicon.ico"] {
            assert_eq!(
                router().classify(&get(path)),
                Some(Strategy::CacheFirst(CachePurpose::Static)),
                "path {path}"
            );
        }
    }

    #[test]
    fn test_static_assets_by_prefix() {
        assert_eq!(router().classify(&get("/assets/logo-512.png")), Some(Strategy::CacheFirst(CachePurpose::Static)));
        assert_eq!(router().classify(&get("/static/data")), Some(Strategy::CacheFirst(CachePurpose::Static)));
    }

    #[test]
    fn test_navigation() {
        let request = AgentRequest::navigate(Url::parse("https://app.test/dashboard").unwrap());
        assert_eq!(router().classify(&request), Some(Strategy::Navigation));
    }

    #[test]
    fn test_asset_wins_over_navigation() {
        let request = AgentRequest::navigate(Url::parse("https://app.test/report.svg").unwrap());
        assert_eq!(router().classify(&request), Some(Strategy::CacheFirst(CachePurpose::Static)));
    }

    #[test]
    fn test_default_network_first() {
        assert_eq!(router().classify(&get("/manifest.json")), Some(Strategy::NetworkFirst(CachePurpose::Dynamic)));
        assert_eq!(router().classify(&get("/dashboard")), Some(Strategy::NetworkFirst(CachePurpose::Dynamic)));
    }

    #[test]
    fn test_api_namespace_takes_precedence() {
        assert_eq!(router().classify(&get("/api/files/report.js")), Some(Strategy::NetworkOnly));
        assert_eq!(router().classify(&get("/api/stats/dashboard")), Some(Strategy::CacheFirst(CachePurpose::Dynamic)));
    }

    #[test]
    fn test_non_get_passes_through() {
        for method in [Method::Post, Method::Put, Method::Patch, Method::Delete, Method::Head, Method::Options] {
            let request = AgentRequest::new(method, Url::parse("https://app.test/assets/app.js").unwrap());
            assert_eq!(router().classify(&request), None, "method {method}");
        }
    }

    #[test]
    fn test_non_http_scheme_passes_through() {
        let request = AgentRequest::get(Url::parse("chrome-extension://abc/app.js").unwrap());
        assert_eq!(router().classify(&request), None);
    }

    #[test]
    fn test_is_api() {
        let r = router();
        assert!(r.is_api(&Url::parse("https://app.test/api/users").unwrap()));
        assert!(r.is_api(&Url::parse("https://app.test/api").unwrap()));
        assert!(!r.is_api(&Url::parse("https://app.test/apiary").unwrap()));
    }

    #[test]
    fn test_extension_parsing() {
        assert_eq!(extension("/a/b.CSS"), Some("css".to_string()));
        assert_eq!(extension("/a/.hidden"), None);
        assert_eq!(extension("/a/noext"), None);
        assert_eq!(extension("/dir.js/"), None);
    }
}
