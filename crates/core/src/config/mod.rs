//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PULSE_*)
//! 2. TOML config file (if PULSE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::orchestrator::FreshnessPolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PULSE_*)
/// 2. TOML config file (if PULSE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer token for the recent-search API.
    ///
    /// Set via PULSE_BEARER_TOKEN environment variable.
    /// Required at startup.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Base URL of the search API.
    ///
    /// Set via PULSE_SEARCH_BASE_URL environment variable.
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Posts requested per upstream call (10-100).
    ///
    /// Set via PULSE_MAX_RESULTS environment variable.
    #[serde(default = "default_max_results")]
    pub max_results: u8,

    /// Path to the SQLite record database.
    ///
    /// Set via PULSE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    ///
    /// Set via PULSE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via PULSE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via PULSE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum snapshot age, in seconds, before it is refetched.
    ///
    /// Set via PULSE_FRESHNESS_SECS environment variable.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Fast cache entry lifetime in seconds.
    ///
    /// Set via PULSE_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of entries held by the fast cache.
    ///
    /// Set via PULSE_CACHE_CAPACITY environment variable.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_search_base_url() -> String {
    "https://api.twitter.com/2".into()
}

fn default_max_results() -> u8 {
    10
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pulse-records.sqlite")
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".into()
}

fn default_user_agent() -> String {
    "pulse/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_freshness_secs() -> u64 {
    43_200 // 12h
}

fn default_cache_ttl_secs() -> u64 {
    3_600 // 1h
}

fn default_cache_capacity() -> usize {
    1_024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            search_base_url: default_search_base_url(),
            max_results: default_max_results(),
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            freshness_secs: default_freshness_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Fast cache capacity, clamped to at least one entry.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Freshness window, cache TTL and upstream timeout for the orchestrator.
    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy {
            window: Duration::from_secs(self.freshness_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            upstream_timeout: self.timeout(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PULSE_`
    /// 2. TOML file from `PULSE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PULSE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PULSE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The bearer token, or a startup error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token is unset or blank.
    pub fn require_bearer_token(&self) -> Result<&str, ConfigError> {
        self.bearer_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "bearer_token".into(),
                hint: "Set PULSE_BEARER_TOKEN environment variable".into(),
            })
    }
}
