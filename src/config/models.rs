use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Upstream source catalog, keyed by source name
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    /// Source pools (primary list + fallback pool chain), keyed by pool name
    #[serde(default)]
    pub pools: HashMap<String, PoolConfig>,
    /// Logical endpoints exposed by the gateway, keyed by endpoint name
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

/// Cache configuration
///
/// When `redis_url` is set the gateway probes it once at startup and falls
/// back to the in-process backend if the probe fails.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_cache_ttl")]
    pub default_ttl: HumanDuration,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: HumanDuration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            connect_timeout: default_connect_timeout(),
            default_ttl: default_cache_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration(Duration::from_secs(2))
}

fn default_cache_ttl() -> HumanDuration {
    HumanDuration(Duration::from_secs(300))
}

fn default_sweep_interval() -> HumanDuration {
    HumanDuration(Duration::from_secs(300))
}

/// Admission control and per-attempt budgets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Per-attempt upstream timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    /// Maximum dispatches in flight across the process
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Outbound attempt budget per second
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
            rate_limit_per_sec: default_rate_limit_per_sec(),
        }
    }
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration(Duration::from_secs(10))
}

fn default_max_concurrency() -> usize {
    64
}

fn default_rate_limit_per_sec() -> u32 {
    100
}

/// Ledger (persistent store) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger")
}

/// Upstream API source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: u32,
    pub base_url: String,
    /// Lower priority is tried first within a tier
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Source pool: a primary tier plus a chain of fallback pools
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Source names forming the primary tier
    pub primary: Vec<String>,
    /// Fallback pool names (e.g., "pools/backup"), tried in order
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

/// Logical endpoint served by the gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Upstream path, appended to each source's base URL
    pub path: String,
    pub category: String,
    /// Pool supplying sources for this endpoint
    pub pool: String,
    /// Per-endpoint TTL; falls back to `cache.default_ttl`. "0s" disables
    /// caching for the endpoint (responses are marked BYPASS).
    pub cache_ttl: Option<HumanDuration>,
}
