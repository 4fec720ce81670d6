//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HARBOR_*)
//! 2. TOML config file (if HARBOR_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Critical-path URLs precached at install: root document, entry routes,
/// manifest and icons.
pub const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/index.html",
    "/login",
    "/register",
    "/dashboard",
    "/manifest.json",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HARBOR_*)
/// 2. TOML config file (if HARBOR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via HARBOR_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the client application; relative request URLs and the
    /// precache manifest resolve against it.
    ///
    /// Set via HARBOR_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix of the remote API namespace.
    ///
    /// Set via HARBOR_API_PREFIX environment variable.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Naming prefix shared by every generation this agent owns.
    ///
    /// Set via HARBOR_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Agent version; bumping it supersedes both generations.
    ///
    /// Set via HARBOR_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URLs stored in the static generation at install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Upper bound on entries kept in the dynamic generation.
    ///
    /// Set via HARBOR_DYNAMIC_MAX_ENTRIES environment variable.
    #[serde(default = "default_dynamic_max_entries")]
    pub dynamic_max_entries: usize,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds.
    ///
    /// Set via HARBOR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Notification title used when a push payload carries none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Notification body used when a push payload carries none.
    #[serde(default = "default_notification_body")]
    pub notification_body: String,

    /// Target view opened on notification click when the payload names none.
    #[serde(default = "default_notification_url")]
    pub notification_url: String,

    /// Icon attached to every notification without its own.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./harbor-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_cache_prefix() -> String {
    "harbor".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_precache() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect()
}

fn default_dynamic_max_entries() -> usize {
    200
}

fn default_user_agent() -> String {
    "harbor-agent/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_notification_title() -> String {
    "New notification".into()
}

fn default_notification_body() -> String {
    "You have a new update.".into()
}

fn default_notification_url() -> String {
    "/dashboard".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            api_prefix: default_api_prefix(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            dynamic_max_entries: default_dynamic_max_entries(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            notification_title: default_notification_title(),
            notification_body: default_notification_body(),
            notification_url: default_notification_url(),
            notification_icon: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HARBOR_`
    /// 2. TOML file from `HARBOR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HARBOR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HARBOR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
