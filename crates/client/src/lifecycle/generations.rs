//! Generation naming.

use harbor_core::CachePurpose;

/// The current generation names for one agent version.
///
/// Names are `{prefix}-static-{version}` and `{prefix}-dynamic-{version}`.
/// The prefix marks a generation as ours; anything without it is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generations {
    prefix: String,
    static_name: String,
    dynamic_name: String,
}

impl Generations {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            static_name: format!("{prefix}-static-{version}"),
            dynamic_name: format!("{prefix}-dynamic-{version}"),
        }
    }

    pub fn name(&self, purpose: CachePurpose) -> &str {
        match purpose {
            CachePurpose::Static => &self.static_name,
            CachePurpose::Dynamic => &self.dynamic_name,
        }
    }

    /// Carries this agent's naming prefix.
    pub fn is_own(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with("-static-") || rest.starts_with("-dynamic-"))
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }

    /// Ours but superseded: safe to reap.
    pub fn is_obsolete(&self, name: &str) -> bool {
        self.is_own(name) && !self.is_current(name)
    }
}
