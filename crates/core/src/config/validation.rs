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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name` or `cache_version` is empty
    /// - `max_retries` exceeds 10
    /// - `retry_delay_ms` is 0 or exceeds 1 minute
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_name".into(), reason: "must not be empty".into() });
        }
        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        if self.max_retries > 10 {
            return Err(ConfigError::Invalid { field: "max_retries".into(), reason: "must not exceed 10".into() });
        }
        if self.retry_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "retry_delay_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.retry_delay_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "retry_delay_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(prefix) = self.scope.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "scope".into(),
                reason: format!("contains an empty prefix ({prefix:?})"),
            });
        }

        if self.scope.is_empty() {
            tracing::warn!("scope is empty; every request will be intercepted");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &AppConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_cache_name() {
        let config = AppConfig { cache_name: " ".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("cache_name"));
    }

    #[test]
    fn test_validate_empty_cache_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("cache_version"));
    }

    #[test]
    fn test_validate_max_retries_exceeds_limit() {
        let config = AppConfig { max_retries: 11, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("max_retries"));
    }

    #[test]
    fn test_validate_zero_retries_allowed() {
        let config = AppConfig { max_retries: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_retry_delay_bounds() {
        let config = AppConfig { retry_delay_ms: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("retry_delay_ms"));

        let config = AppConfig { retry_delay_ms: 60_001, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("retry_delay_ms"));
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("max_bytes"));

        let config = AppConfig { max_bytes: 101 * 1024 * 1024, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_empty_scope_prefix() {
        let config = AppConfig { scope: vec!["https://x/".into(), "".into()], ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("scope"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, retry_delay_ms: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
