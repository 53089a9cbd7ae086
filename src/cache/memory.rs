//! In-process cache backend
//!
//! Used when the shared Redis store is unreachable at startup. Entries are
//! lazily evicted on the read that discovers them expired; a periodic sweep
//! removes the rest to bound memory. The sweep task is owned by the backend
//! and aborted on drop.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{CacheBackend, CacheError};

struct CacheItem {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheItem {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheItem>>>,
    sweeper: Option<JoinHandle<()>>,
}

impl MemoryCache {
    /// Create a backend with a periodic expiry sweep
    pub fn new(sweep_interval: Duration) -> Self {
        let entries: Arc<Mutex<HashMap<String, CacheItem>>> = Arc::new(Mutex::new(HashMap::new()));

        let sweep_entries = Arc::clone(&entries);
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            // First tick fires immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sweep(&sweep_entries);
                if removed > 0 {
                    debug!(removed, "Cache sweep evicted expired entries");
                }
            }
        });

        Self {
            entries,
            sweeper: Some(sweeper),
        }
    }

    /// Create a backend with no background sweep (lazy eviction only)
    pub fn without_sweeper() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            sweeper: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

/// Remove every expired entry; returns the number evicted
fn sweep(entries: &Mutex<HashMap<String, CacheItem>>) -> usize {
    let now = Instant::now();
    let mut entries = entries.lock().expect("cache lock poisoned");
    let before = entries.len();
    entries.retain(|_, item| !item.is_expired(now));
    before - entries.len()
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(key) {
            Some(item) if item.is_expired(now) => {
                // Lazy eviction on the read that discovers expiry
                entries.remove(key);
                Ok(None)
            }
            Some(item) => Ok(Some(item.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let item = CacheItem {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.to_string(), item);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = MemoryCache::without_sweeper();
        cache
            .set("k", b"value".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryCache::without_sweeper();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry_and_lazy_eviction() {
        let cache = MemoryCache::without_sweeper();
        cache
            .set("k", b"value".to_vec(), Duration::from_millis(20))
            .await
            .unwrap();

        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        // The expired read removed the entry
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::without_sweeper();
        cache
            .set("k", b"value".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("k").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired() {
        let cache = MemoryCache::new(Duration::from_millis(25));
        cache
            .set("short", b"a".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .set("long", b"b".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        // Sweep removed the expired entry without any read touching it
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_value() {
        let cache = MemoryCache::without_sweeper();
        cache
            .set("k", b"old".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("k", b"new".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"new".to_vec()));
    }
}
