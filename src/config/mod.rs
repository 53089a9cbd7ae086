//! Configuration management for the gateway
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `APIRELAY__<section>__<key>`
//!
//! Examples:
//! - `APIRELAY__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `APIRELAY__CACHE__REDIS_URL=redis://prod-cache:6379`
//! - `APIRELAY__LIMITS__MAX_CONCURRENCY=128`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/apirelay.toml`.
//! This can be overridden using the `APIRELAY_CONFIG` environment variable.
//!
//! The catalog sections (`[sources.*]`, `[pools.*]`, `[endpoints.*]`) feed the
//! source registry; everything else is global settings.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    CacheConfig, Config, EndpointConfig, LedgerConfig, LimitsConfig, PoolConfig, ServerConfig,
    SourceConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation
    /// fails (bad references, fallback cycles, zero limits).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[sources.main]
id = 1
base_url = "https://api.example.com"

[pools.default]
primary = ["main"]

[endpoints.home]
path = "/api/v1/home"
category = "anime"
pool = "default"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.endpoints.len(), 1);
    }

    #[test]
    fn test_validation_catches_missing_pool() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[endpoints.home]
path = "/api/v1/home"
category = "anime"
pool = "nonexistent"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidPoolReference { .. })
        ));
    }
}
