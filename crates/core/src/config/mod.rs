//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REVCACHE_*)
//! 2. TOML config file (if REVCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::key::generation_name;
use crate::manifest::{ManifestEntry, StaticManifest};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REVCACHE_*)
/// 2. TOML config file (if REVCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via REVCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Logical cache name shared by every generation of this deployment.
    ///
    /// Set via REVCACHE_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Controller version; bumping it rotates to a fresh generation.
    ///
    /// Set via REVCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URL prefixes whose requests are intercepted. Empty intercepts everything.
    ///
    /// Set via REVCACHE_SCOPE environment variable.
    #[serde(default)]
    pub scope: Vec<String>,

    /// Inline manifest entries (`[[manifest]]` tables in TOML).
    #[serde(default)]
    pub manifest: Vec<ManifestEntry>,

    /// JSON manifest file, appended after the inline entries.
    ///
    /// Set via REVCACHE_MANIFEST_PATH environment variable.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Retries after the first failed precache fetch.
    ///
    /// Set via REVCACHE_MAX_RETRIES environment variable.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds; doubles on each retry.
    ///
    /// Set via REVCACHE_RETRY_DELAY_MS environment variable.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via REVCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via REVCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via REVCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./revcache.sqlite")
}

fn default_cache_name() -> String {
    "revcache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_user_agent() -> String {
    "revcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    20_971_520 // 20MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_name: default_cache_name(),
            cache_version: default_cache_version(),
            scope: Vec::new(),
            manifest: Vec::new(),
            manifest_path: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base retry delay as Duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Name of the generation owned by this version, e.g. `revcache-v1`.
    pub fn generation_name(&self) -> String {
        generation_name(&self.cache_name, &self.cache_version)
    }

    /// Assemble the manifest from inline entries and `manifest_path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` if the file cannot be read or the
    /// combined entries contain empty or duplicate URLs.
    pub fn manifest(&self) -> Result<StaticManifest, crate::Error> {
        let mut entries = self.manifest.clone();
        if let Some(path) = &self.manifest_path {
            entries.extend(StaticManifest::from_json_file(path)?.into_entries());
        }
        StaticManifest::new(entries)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REVCACHE_`
    /// 2. TOML file from `REVCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("REVCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REVCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
