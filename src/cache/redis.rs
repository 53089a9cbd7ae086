//! Shared Redis cache backend
//!
//! Connects once at startup under a short timeout; the caller falls back to
//! the in-process backend when the probe fails. TTL handling is delegated to
//! Redis via `SET .. EX`.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::info;

use super::{CacheBackend, CacheError};

pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect and verify the server responds within `connect_timeout`
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;

        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::ConnectTimeout)??;

        // Round-trip once so an unreachable server fails here, not mid-request
        let mut probe = manager.clone();
        tokio::time::timeout(connect_timeout, async {
            redis::cmd("PING").query_async::<String>(&mut probe).await
        })
        .await
        .map_err(|_| CacheError::ConnectTimeout)??;

        info!(url, "Connected to shared Redis cache");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.manager.clone();
        let value: Option<Vec<u8>> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut con = self.manager.clone();
        // Redis EX takes whole seconds; round sub-second TTLs up
        let secs = ttl.as_secs().max(1);
        con.set_ex::<_, _, ()>(key, value, secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut con = self.manager.clone();
        con.del::<_, ()>(key).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
