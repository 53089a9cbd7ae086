use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::error::Result;
use super::partitions::{
    decode_stats_key, encode_health_key, encode_health_prefix, encode_request_key,
    encode_stats_key,
};
use super::records::{HealthCheckRecord, RequestRecord, SourceStats};

/// Fjall-backed persistent storage for request logs, health checks, and
/// per-source statistics
#[derive(Clone)]
pub struct LedgerStore {
    keyspace: Keyspace,
    requests: PartitionHandle,
    health: PartitionHandle,
    stats: PartitionHandle,
}

impl LedgerStore {
    /// Open or create a ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening ledger at: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let requests = keyspace.open_partition("requests", PartitionCreateOptions::default())?;
        let health = keyspace.open_partition("health", PartitionCreateOptions::default())?;
        let stats = keyspace.open_partition("stats", PartitionCreateOptions::default())?;

        info!("Ledger opened successfully");
        Ok(Self {
            keyspace,
            requests,
            health,
            stats,
        })
    }

    /// Append one dispatch record
    pub fn log_request(&self, record: &RequestRecord) -> Result<()> {
        let key = encode_request_key(&record.id);
        let value = serde_json::to_vec(record)?;
        self.requests.insert(key, value)?;
        debug!(request_id = %record.id, "Logged request");
        Ok(())
    }

    /// Append one per-attempt health check
    pub fn log_health_check(&self, record: &HealthCheckRecord) -> Result<()> {
        let millis = record.timestamp.timestamp_millis().max(0) as u64;
        let key = encode_health_key(record.source_id, millis);
        let value = serde_json::to_vec(record)?;
        self.health.insert(key, value)?;
        Ok(())
    }

    /// Store or update aggregate stats for a source
    pub fn upsert_stats(&self, stats: &SourceStats) -> Result<()> {
        let key = encode_stats_key(&stats.source_name);
        let value = serde_json::to_vec(stats)?;
        self.stats.insert(key, value)?;
        Ok(())
    }

    /// Get aggregate stats for one source
    pub fn get_stats(&self, source_name: &str) -> Result<Option<SourceStats>> {
        let key = encode_stats_key(source_name);
        match self.stats.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All per-source stats, for the stats surface
    pub fn all_stats(&self) -> Result<Vec<SourceStats>> {
        let mut out = Vec::new();
        for item in self.stats.iter() {
            let (key, value) = item?;
            if decode_stats_key(&key).is_some() {
                out.push(serde_json::from_slice(&value)?);
            }
        }
        Ok(out)
    }

    /// Most recent health checks for a source, newest first
    pub fn recent_health(&self, source_id: u32, limit: usize) -> Result<Vec<HealthCheckRecord>> {
        let prefix = encode_health_prefix(source_id);
        let mut out = Vec::new();
        for item in self.health.prefix(prefix).rev().take(limit) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal counts (for debugging/monitoring)
    pub fn counts(&self) -> Result<StoreCounts> {
        let mut request_count = 0;
        let mut health_count = 0;
        let mut stats_count = 0;

        for item in self.requests.iter() {
            item?;
            request_count += 1;
        }
        for item in self.health.iter() {
            item?;
            health_count += 1;
        }
        for item in self.stats.iter() {
            item?;
            stats_count += 1;
        }

        Ok(StoreCounts {
            request_count,
            health_count,
            stats_count,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoreCounts {
    pub request_count: usize,
    pub health_count: usize,
    pub stats_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_store() -> (LedgerStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LedgerStore::open(temp_dir.path().join("test_ledger")).unwrap();
        (store, temp_dir)
    }

    fn request_record(id: &str) -> RequestRecord {
        RequestRecord {
            id: id.to_string(),
            category: "anime".to_string(),
            endpoint: "/api/v1/home".to_string(),
            source: "main_api".to_string(),
            cache_status: "MISS".to_string(),
            success: true,
            attempts: 1,
            total_time_ms: 120,
            client_ip: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_open_store() {
        let temp_dir = TempDir::new().unwrap();
        assert!(LedgerStore::open(temp_dir.path().join("ledger")).is_ok());
    }

    #[test]
    fn test_log_request() {
        let (store, _temp) = create_test_store();
        store.log_request(&request_record("req_1")).unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.request_count, 1);
    }

    #[test]
    fn test_stats_roundtrip() {
        let (store, _temp) = create_test_store();

        let mut stats = SourceStats::new("main_api");
        stats.observe(true, 80, Some(200), None);
        store.upsert_stats(&stats).unwrap();

        let loaded = store.get_stats("main_api").unwrap().unwrap();
        assert_eq!(loaded.attempts, 1);
        assert_eq!(loaded.successes, 1);
        assert_eq!(loaded.avg_response_ms, 80.0);

        assert!(store.get_stats("unknown").unwrap().is_none());
    }

    #[test]
    fn test_all_stats() {
        let (store, _temp) = create_test_store();
        store.upsert_stats(&SourceStats::new("a")).unwrap();
        store.upsert_stats(&SourceStats::new("b")).unwrap();

        let all = store.all_stats().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_recent_health_order_and_limit() {
        let (store, _temp) = create_test_store();

        for i in 0..5u64 {
            let record = HealthCheckRecord {
                source_id: 1,
                source_name: "main_api".to_string(),
                healthy: i % 2 == 0,
                response_time_ms: i * 10,
                error_message: None,
                timestamp: Utc::now() + chrono::Duration::milliseconds(i as i64),
            };
            store.log_health_check(&record).unwrap();
        }

        let recent = store.recent_health(1, 3).unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first
        assert_eq!(recent[0].response_time_ms, 40);

        // Other sources are untouched
        assert!(store.recent_health(99, 10).unwrap().is_empty());
    }

    #[test]
    fn test_persist() {
        let (store, _temp) = create_test_store();
        store.log_request(&request_record("req_persist")).unwrap();
        store.persist().unwrap();
    }
}
