//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `api_prefix` does not start and end with `/`
    /// - `cache_prefix` or `cache_version` is empty or contains whitespace
    /// - `precache` contains an empty entry
    /// - `dynamic_max_entries` is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if !self.api_prefix.starts_with('/') || !self.api_prefix.ends_with('/') || self.api_prefix.len() < 2 {
            return Err(invalid("api_prefix", "must look like /name/"));
        }

        for (field, value) in [("cache_prefix", &self.cache_prefix), ("cache_version", &self.cache_version)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        if self.precache.iter().any(|entry| entry.trim().is_empty()) {
            return Err(invalid("precache", "entries must not be empty"));
        }
        if self.precache.is_empty() {
            tracing::warn!("precache manifest is empty; offline navigation will have no root document");
        }

        if self.dynamic_max_entries == 0 {
            return Err(invalid("dynamic_max_entries", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "origin");
    }

    #[test]
    fn test_validate_api_prefix_shape() {
        for prefix in ["api/", "/api", "/", ""] {
            let config = AppConfig { api_prefix: prefix.into(), ..Default::default() };
            assert_eq!(field_of(config.validate()), "api_prefix", "prefix {prefix:?}");
        }
    }

    #[test]
    fn test_validate_cache_naming() {
        let config = AppConfig { cache_prefix: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "cache_prefix");

        let config = AppConfig { cache_version: "v 2".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "cache_version");
    }

    #[test]
    fn test_validate_precache_entries() {
        let config = AppConfig { precache: vec!["/".into(), " ".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()), "precache");

        let config = AppConfig { precache: Vec::new(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_dynamic_max_entries_zero() {
        let config = AppConfig { dynamic_max_entries: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "dynamic_max_entries");
    }

    #[test]
    fn test_validate_max_bytes_limits() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");
    }

    #[test]
    fn test_validate_timeout_limits() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "user_agent");
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, dynamic_max_entries: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
