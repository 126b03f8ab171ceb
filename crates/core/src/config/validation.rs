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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Longest accepted freshness window or cache TTL (30 days).
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

impl ConfigError {
    fn invalid(field: &str, reason: &str) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_results` is outside 10..=100
    /// - `freshness_secs`, `cache_ttl_secs` or `cache_capacity` is 0
    /// - `freshness_secs` or `cache_ttl_secs` exceeds [`MAX_WINDOW_SECS`]
    /// - `user_agent`, `search_base_url` or `bind_addr` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if !(10..=100).contains(&self.max_results) {
            return Err(ConfigError::invalid("max_results", "must be between 10 and 100"));
        }

        if self.freshness_secs == 0 {
            return Err(ConfigError::invalid("freshness_secs", "must be greater than 0"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::invalid("cache_ttl_secs", "must be greater than 0"));
        }
        if self.freshness_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::invalid("freshness_secs", "must not exceed 30 days (2592000s)"));
        }
        if self.cache_ttl_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::invalid("cache_ttl_secs", "must not exceed 30 days (2592000s)"));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::invalid("cache_capacity", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }
        if self.search_base_url.is_empty() {
            return Err(ConfigError::invalid("search_base_url", "must not be empty"));
        }
        if self.bind_addr.is_empty() {
            return Err(ConfigError::invalid("bind_addr", "must not be empty"));
        }

        if self.cache_ttl_secs > self.freshness_secs {
            tracing::warn!(
                cache_ttl_secs = self.cache_ttl_secs,
                freshness_secs = self.freshness_secs,
                "cache_ttl_secs exceeds freshness_secs; \
                 fast cache entries will outlive their freshness"
            );
        }

        Ok(())
    }
}
