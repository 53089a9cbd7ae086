//! Cache abstraction: one contract, two backends
//!
//! The gateway caches normalized responses keyed by
//! `<category>:<endpoint>:<paramHash>`. Backend selection happens once at
//! startup: if `cache.redis_url` is set and reachable within the connect
//! timeout the shared Redis store is used, otherwise the process runs on the
//! in-process backend in degraded (single-instance) mode. The choice is not
//! revisited at runtime.
//!
//! Cache failures never fail a request: read errors are treated as misses,
//! write errors are logged and swallowed.

mod key;
mod memory;
mod redis;

pub use key::generate_key;
pub use memory::MemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::CacheConfig;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Connection attempt timed out")]
    ConnectTimeout,
}

/// Storage contract shared by both backends
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    fn backend_name(&self) -> &'static str;
}

/// Fail-open facade over the active backend
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// In-process cache with the given sweep interval
    pub fn in_memory(sweep_interval: Duration) -> Self {
        Self::new(Arc::new(MemoryCache::new(sweep_interval)))
    }

    /// Select a backend per the startup fallback policy: probe Redis when
    /// configured, otherwise (or on probe failure) run in-process.
    pub async fn connect(config: &CacheConfig) -> Self {
        if let Some(url) = &config.redis_url {
            match RedisCache::connect(url, config.connect_timeout.as_duration()).await {
                Ok(backend) => return Self::new(Arc::new(backend)),
                Err(error) => {
                    warn!(
                        url,
                        %error,
                        "Shared cache unreachable, falling back to in-process backend"
                    );
                }
            }
        }
        Self::in_memory(config.sweep_interval.as_duration())
    }

    /// Read a value; backend errors are treated as a miss
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write a value; backend errors are logged and swallowed
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        if let Err(error) = self.backend.set(key, value, ttl).await {
            warn!(key, %error, "Cache write failed, response served uncached");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(error) = self.backend.delete(key).await {
            warn!(key, %error, "Cache delete failed");
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }
}
