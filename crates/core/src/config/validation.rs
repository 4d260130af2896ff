//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Longest accepted cache TTL: 30 days.
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `base_url` is not an absolute http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `connect_timeout_ms` is less than 100ms or exceeds `timeout_ms`
    /// - `max_attempts` is outside 1..=10
    /// - `backoff_ms` exceeds 10 seconds
    /// - `cache_ttl_secs` is 0 or exceeds 30 days
    /// - `hydrate_concurrency` is outside 1..=32
    /// - `stats_interval_secs` is below 10 seconds
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.connect_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "connect_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.connect_timeout_ms > self.timeout_ms {
            return Err(ConfigError::Invalid {
                field: "connect_timeout_ms".into(),
                reason: "must not exceed timeout_ms".into(),
            });
        }

        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::Invalid { field: "max_attempts".into(), reason: "must be between 1 and 10".into() });
        }

        if self.backoff_ms > 10_000 {
            return Err(ConfigError::Invalid { field: "backoff_ms".into(), reason: "must not exceed 10000ms".into() });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: format!("must not exceed 30 days ({MAX_CACHE_TTL_SECS}s)"),
            });
        }

        if !(1..=32).contains(&self.hydrate_concurrency) {
            return Err(ConfigError::Invalid {
                field: "hydrate_concurrency".into(),
                reason: "must be between 1 and 32".into(),
            });
        }

        if self.stats_interval_secs < 10 {
            return Err(ConfigError::Invalid {
                field: "stats_interval_secs".into(),
                reason: "must be at least 10 seconds".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
