//! Source registry: ordered view over configured upstream sources
//!
//! Endpoints reference pools; pools resolve into tiers (tier 0 = primary,
//! tier 1+ = fallback pools in declaration order). Within each tier sources
//! are ordered by ascending priority. Inactive sources never participate.
//!
//! The catalog lives behind a `RwLock` so activation flips and full reloads
//! become visible to subsequent dispatches without a restart; in-flight
//! dispatches keep the snapshot they already took.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Pool '{0}' not found")]
    PoolNotFound(String),

    #[error("Cycle detected in pool fallback chain: {0}")]
    CycleDetected(String),

    #[error("Pool '{pool}' references unknown source '{source_name}'")]
    UnknownSource { pool: String, source_name: String },
}

/// One upstream API source as seen by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSource {
    pub id: u32,
    pub name: String,
    pub base_url: String,
    pub priority: u32,
    pub is_primary: bool,
    pub is_active: bool,
}

/// Resolved endpoint entry: identity plus tiered source lists
#[derive(Debug, Clone)]
struct EndpointEntry {
    name: String,
    category: String,
    cache_ttl: Duration,
    /// Tier 0 = primary sources, tier 1+ = fallback tiers in order.
    /// Holds inactive sources too; they are filtered at read time so
    /// activation flips take effect without re-resolution.
    tiers: Vec<Vec<ApiSource>>,
}

/// Endpoint identity handed to the dispatcher alongside the source sequence
#[derive(Debug, Clone)]
pub struct EndpointInfo {
    pub name: String,
    pub category: String,
    pub cache_ttl: Duration,
}

/// Registry mapping endpoint paths to their ordered source sequences
#[derive(Debug)]
pub struct SourceRegistry {
    endpoints: RwLock<HashMap<String, EndpointEntry>>,
}

impl SourceRegistry {
    /// Build the registry by resolving every endpoint's pool chain
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let endpoints = resolve_catalog(config)?;
        Ok(Self {
            endpoints: RwLock::new(endpoints),
        })
    }

    /// Replace the whole catalog; subsequent dispatches see the new view
    pub fn reload(&self, config: &Config) -> Result<(), RegistryError> {
        let endpoints = resolve_catalog(config)?;
        *self.endpoints.write().expect("registry lock poisoned") = endpoints;
        Ok(())
    }

    /// Endpoint identity for a request path, if configured
    pub fn endpoint(&self, path: &str) -> Option<EndpointInfo> {
        let endpoints = self.endpoints.read().expect("registry lock poisoned");
        endpoints.get(path).map(|entry| EndpointInfo {
            name: entry.name.clone(),
            category: entry.category.clone(),
            cache_ttl: entry.cache_ttl,
        })
    }

    /// Ordered source sequence for an endpoint path: active primaries by
    /// ascending priority, then each fallback tier in declared order.
    ///
    /// Returns `None` for an unknown path. An empty vec means the endpoint
    /// exists but has no active sources; the dispatcher treats both as a
    /// configuration error.
    pub fn sources_for(&self, path: &str) -> Option<Vec<ApiSource>> {
        let endpoints = self.endpoints.read().expect("registry lock poisoned");
        let entry = endpoints.get(path)?;

        let mut ordered = Vec::new();
        for tier in &entry.tiers {
            ordered.extend(tier.iter().filter(|s| s.is_active).cloned());
        }
        Some(ordered)
    }

    /// Flip a source's active flag everywhere it appears
    pub fn set_source_active(&self, source_name: &str, active: bool) {
        let mut endpoints = self.endpoints.write().expect("registry lock poisoned");
        for entry in endpoints.values_mut() {
            for tier in &mut entry.tiers {
                for source in tier.iter_mut() {
                    if source.name == source_name {
                        source.is_active = active;
                    }
                }
            }
        }
    }

    /// All configured endpoint paths (for the stats surface)
    pub fn endpoint_paths(&self) -> Vec<String> {
        let endpoints = self.endpoints.read().expect("registry lock poisoned");
        endpoints.keys().cloned().collect()
    }
}

fn resolve_catalog(config: &Config) -> Result<HashMap<String, EndpointEntry>, RegistryError> {
    let mut endpoints = HashMap::new();

    for (name, endpoint) in &config.endpoints {
        let pool_name = endpoint.pool.strip_prefix("pools/").unwrap_or(&endpoint.pool);

        let mut visited = HashSet::new();
        let mut tiers = Vec::new();
        resolve_pool(config, pool_name, &mut visited, &mut tiers)?;

        let cache_ttl = endpoint
            .cache_ttl
            .unwrap_or(config.cache.default_ttl)
            .as_duration();

        endpoints.insert(
            endpoint.path.clone(),
            EndpointEntry {
                name: name.clone(),
                category: endpoint.category.clone(),
                cache_ttl,
                tiers,
            },
        );
    }

    Ok(endpoints)
}

/// Resolve a pool into tiers, following fallback chains depth-first
fn resolve_pool(
    config: &Config,
    current: &str,
    visited: &mut HashSet<String>,
    tiers: &mut Vec<Vec<ApiSource>>,
) -> Result<(), RegistryError> {
    let pool_name = current.strip_prefix("pools/").unwrap_or(current);

    // Cycle detection
    if visited.contains(pool_name) {
        return Err(RegistryError::CycleDetected(pool_name.to_string()));
    }
    visited.insert(pool_name.to_string());

    let pool = config
        .pools
        .get(pool_name)
        .ok_or_else(|| RegistryError::PoolNotFound(pool_name.to_string()))?;

    let is_primary = tiers.is_empty();

    let mut tier = Vec::with_capacity(pool.primary.len());
    for source_name in &pool.primary {
        let source = config.sources.get(source_name).ok_or_else(|| {
            RegistryError::UnknownSource {
                pool: pool_name.to_string(),
                source_name: source_name.clone(),
            }
        })?;

        tier.push(ApiSource {
            id: source.id,
            name: source_name.clone(),
            base_url: source.base_url.clone(),
            priority: source.priority,
            is_primary,
            is_active: source.active,
        });
    }

    // Ascending priority within the tier; name as a deterministic tiebreak
    tier.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
    tiers.push(tier);

    for fallback in &pool.fallbacks {
        resolve_pool(config, fallback, visited, tiers)?;
    }

    Ok(())
}
