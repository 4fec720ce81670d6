//! Sub-policy for the remote API namespace.
//!
//! Mutations are never served stale, a few slow-changing reads trade
//! freshness for availability, and everything else goes to the network
//! untouched since nothing is known about it.

use harbor_core::CachePurpose;

use super::{RoutePattern, Strategy, first_match};

/// Login, registration, logout, CRUD segments, message sends and match actions.
const MUTATION_PATTERNS: &[&str] = &[
    r"^auth/(login|register|logout)(/|$)",
    r"(^|/)(create|update|delete)(/|$)",
    r"^messages/send(/|$)",
    r"^match(es)?(/|$)",
];

/// Auth check, dashboard aggregates, own profile.
const READ_MOSTLY_PATTERNS: &[&str] = &[r"^auth/verify(/|$)", r"^stats/dashboard(/|$)", r"^profile/?$"];

/// Ordered rules over the path below the API prefix.
#[derive(Debug, Clone)]
pub struct ApiPolicy {
    rules: Vec<RoutePattern>,
    fallback: Strategy,
}

impl ApiPolicy {
    /// Custom rules; unmatched paths get `fallback`.
    pub fn new(rules: Vec<RoutePattern>, fallback: Strategy) -> Self {
        Self { rules, fallback }
    }

    /// Mutations network-first, read-mostly endpoints cache-first, both on
    /// the dynamic generation; anything else network-only.
    pub fn standard() -> Self {
        let network_first = Strategy::NetworkFirst(CachePurpose::Dynamic);
        let cache_first = Strategy::CacheFirst(CachePurpose::Dynamic);

        let rules = MUTATION_PATTERNS
            .iter()
            .map(|re| (re, network_first))
            .chain(READ_MOSTLY_PATTERNS.iter().map(|re| (re, cache_first)))
            .map(|(re, strategy)| RoutePattern::pattern(re, strategy).expect("built-in API pattern must compile"))
            .collect();

        Self::new(rules, Strategy::NetworkOnly)
    }

    /// Strategy for a path below the API prefix (no leading slash).
    pub fn classify(&self, api_path: &str) -> Strategy {
        let strategy = first_match(&self.rules, api_path).unwrap_or(self.fallback);
        tracing::trace!(api_path, %strategy, "api route");
        strategy
    }
}
