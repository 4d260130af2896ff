//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HOLONET_*)
//! 2. TOML config file (if HOLONET_CONFIG_FILE set)
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

/// Which [`crate::CacheStore`] backs the cache-aside layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-lifetime in-memory map.
    Memory,
    /// The `resource_cache` table in the SQLite database at `db_path`.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HOLONET_*)
/// 2. TOML config file (if HOLONET_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the upstream catalog API.
    ///
    /// Set via HOLONET_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path to the SQLite database (query log, statistics, optional cache).
    ///
    /// Set via HOLONET_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache backend for upstream resources.
    ///
    /// Set via HOLONET_CACHE_BACKEND environment variable (`memory` or `sqlite`).
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// User-Agent string for upstream requests.
    ///
    /// Set via HOLONET_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect timeout per attempt in milliseconds.
    ///
    /// Set via HOLONET_CONNECT_TIMEOUT_MS environment variable.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Total timeout per attempt in milliseconds.
    ///
    /// Set via HOLONET_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per upstream call, including the first.
    ///
    /// Set via HOLONET_MAX_ATTEMPTS environment variable.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds (`step × attempt`).
    ///
    /// Set via HOLONET_BACKOFF_MS environment variable.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Lifetime of cached resources in seconds.
    ///
    /// Set via HOLONET_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum concurrent reference fetches while hydrating one entity.
    ///
    /// Set via HOLONET_HYDRATE_CONCURRENCY environment variable.
    #[serde(default = "default_hydrate_concurrency")]
    pub hydrate_concurrency: usize,

    /// Interval of the statistics aggregation job in seconds.
    ///
    /// Set via HOLONET_STATS_INTERVAL_SECS environment variable.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_base_url() -> String {
    "https://www.swapi.tech/api/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./holonet.sqlite")
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_user_agent() -> String {
    "holonet/0.1".into()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_cache_ttl_secs() -> u64 {
    3_600
}

fn default_hydrate_concurrency() -> usize {
    4
}

fn default_stats_interval_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            db_path: default_db_path(),
            cache_backend: default_cache_backend(),
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            hydrate_concurrency: default_hydrate_concurrency(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Parsed base URL, normalized to end with `/` so relative paths join
    /// beneath it instead of replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `base_url` is not an absolute http(s) URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "base_url".into(), reason: "scheme must be http or https".into() });
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HOLONET_`
    /// 2. TOML file from `HOLONET_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("HOLONET_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HOLONET_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
