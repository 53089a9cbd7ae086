use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "APIRELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/apirelay.toml";
const ENV_PREFIX: &str = "APIRELAY";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    // Start with defaults (handled by struct Default implementations)
    // Add TOML file if it exists (optional)
    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // Add environment variable overrides
    // APIRELAY__SERVER__BIND_ADDR -> server.bind_addr
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"

[limits]
request_timeout = "5s"
max_concurrency = 16
rate_limit_per_sec = 20

[cache]
redis_url = "redis://localhost:6379"
default_ttl = "10m"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.limits.request_timeout.as_secs(), 5);
        assert_eq!(config.limits.max_concurrency, 16);
        assert_eq!(config.cache.default_ttl.as_secs(), 600);
        assert_eq!(
            config.cache.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
    }

    #[test]
    fn test_full_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[sources.main_api]
id = 1
base_url = "https://api.example.com"
priority = 1

[sources.mirror_api]
id = 2
base_url = "https://mirror.example.com"
priority = 2

[sources.backup_api]
id = 3
base_url = "https://backup.example.com"
active = false

[pools.default]
primary = ["main_api", "mirror_api"]
fallbacks = ["reserve"]

[pools.reserve]
primary = ["backup_api"]
fallbacks = []

[endpoints.home]
path = "/api/v1/home"
category = "anime"
pool = "default"
cache_ttl = "5m"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.pools.len(), 2);
        assert_eq!(config.endpoints.len(), 1);

        let home = &config.endpoints["home"];
        assert_eq!(home.path, "/api/v1/home");
        assert_eq!(home.category, "anime");
        assert_eq!(home.cache_ttl.unwrap().as_secs(), 300);

        assert!(!config.sources["backup_api"].active);
        assert_eq!(config.pools["default"].fallbacks, vec!["reserve"]);
    }
}
