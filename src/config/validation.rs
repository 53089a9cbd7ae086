use super::models::{Config, PoolConfig};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Endpoint '{endpoint}' references non-existent pool '{pool}'")]
    InvalidPoolReference { endpoint: String, pool: String },

    #[error("Pool '{pool}' references non-existent source '{source_name}'")]
    InvalidSourceReference { pool: String, source_name: String },

    #[error("Pool '{pool}' references non-existent fallback '{fallback}'")]
    InvalidFallbackReference { pool: String, fallback: String },

    #[error("Pool fallback cycle detected: {path}")]
    PoolFallbackCycle { path: String },

    #[error("Duplicate source id {id} (sources '{first}' and '{second}')")]
    DuplicateSourceId {
        id: u32,
        first: String,
        second: String,
    },

    #[error("Duplicate endpoint path '{path}' (endpoints '{first}' and '{second}')")]
    DuplicateEndpointPath {
        path: String,
        first: String,
        second: String,
    },

    #[error(
        "Source '{source_name}' has invalid base_url '{base_url}' (expected http:// or https://)"
    )]
    InvalidBaseUrl {
        source_name: String,
        base_url: String,
    },

    #[error("limits.max_concurrency must be positive")]
    InvalidMaxConcurrency,

    #[error("limits.rate_limit_per_sec must be positive")]
    InvalidRateLimit,

    #[error("limits.request_timeout must be positive")]
    InvalidRequestTimeout,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_sources(config)?;
    validate_pools(config)?;
    validate_endpoints(config)?;
    validate_limits(config)?;
    Ok(())
}

/// Check base URLs and source id uniqueness
fn validate_sources(config: &Config) -> Result<(), ValidationError> {
    let mut seen_ids: HashMap<u32, &str> = HashMap::new();

    for (name, source) in &config.sources {
        if !source.base_url.starts_with("http://") && !source.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl {
                source_name: name.clone(),
                base_url: source.base_url.clone(),
            });
        }

        if let Some(first) = seen_ids.insert(source.id, name) {
            return Err(ValidationError::DuplicateSourceId {
                id: source.id,
                first: first.to_string(),
                second: name.clone(),
            });
        }
    }

    Ok(())
}

/// Validate pool member/fallback references and detect fallback cycles
fn validate_pools(config: &Config) -> Result<(), ValidationError> {
    for (pool_name, pool) in &config.pools {
        for source in &pool.primary {
            if !config.sources.contains_key(source) {
                return Err(ValidationError::InvalidSourceReference {
                    pool: pool_name.clone(),
                    source_name: source.clone(),
                });
            }
        }

        for fallback in &pool.fallbacks {
            let fallback_name = fallback.strip_prefix("pools/").unwrap_or(fallback);

            if !config.pools.contains_key(fallback_name) {
                return Err(ValidationError::InvalidFallbackReference {
                    pool: pool_name.clone(),
                    fallback: fallback.clone(),
                });
            }
        }
    }

    // Detect cycles using DFS
    for pool_name in config.pools.keys() {
        detect_cycles(
            pool_name,
            &config.pools,
            &mut HashSet::new(),
            &mut Vec::new(),
        )?;
    }

    Ok(())
}

/// DFS-based cycle detection in pool fallback chains
fn detect_cycles(
    current: &str,
    pools: &HashMap<String, PoolConfig>,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Result<(), ValidationError> {
    if path.contains(&current.to_string()) {
        // Cycle detected
        path.push(current.to_string());
        return Err(ValidationError::PoolFallbackCycle {
            path: path.join(" -> "),
        });
    }

    if visited.contains(current) {
        return Ok(()); // Already explored this path
    }

    visited.insert(current.to_string());
    path.push(current.to_string());

    if let Some(pool) = pools.get(current) {
        for fallback in &pool.fallbacks {
            let fallback_name = fallback.strip_prefix("pools/").unwrap_or(fallback);
            detect_cycles(fallback_name, pools, visited, path)?;
        }
    }

    path.pop();
    Ok(())
}

/// Check pool references and endpoint path uniqueness
fn validate_endpoints(config: &Config) -> Result<(), ValidationError> {
    let mut seen_paths: HashMap<&str, &str> = HashMap::new();

    for (name, endpoint) in &config.endpoints {
        let pool_name = endpoint.pool.strip_prefix("pools/").unwrap_or(&endpoint.pool);

        if !config.pools.contains_key(pool_name) {
            return Err(ValidationError::InvalidPoolReference {
                endpoint: name.clone(),
                pool: endpoint.pool.clone(),
            });
        }

        if let Some(first) = seen_paths.insert(endpoint.path.as_str(), name) {
            return Err(ValidationError::DuplicateEndpointPath {
                path: endpoint.path.clone(),
                first: first.to_string(),
                second: name.clone(),
            });
        }
    }

    Ok(())
}

fn validate_limits(config: &Config) -> Result<(), ValidationError> {
    if config.limits.max_concurrency == 0 {
        return Err(ValidationError::InvalidMaxConcurrency);
    }
    if config.limits.rate_limit_per_sec == 0 {
        return Err(ValidationError::InvalidRateLimit);
    }
    if config.limits.request_timeout.is_zero() {
        return Err(ValidationError::InvalidRequestTimeout);
    }
    Ok(())
}
