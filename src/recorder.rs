//! Health/stats recorder: passive observer fed by the dispatcher
//!
//! Aggregates per-source counters in memory and writes through to the
//! ledger. Every entry point returns `()`: a recorder failure is logged at
//! warn and never surfaces to the dispatch that fed it.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::ledger::{HealthCheckRecord, LedgerStore, RequestRecord, SourceStats};

pub struct Recorder {
    store: Arc<LedgerStore>,
    stats: RwLock<HashMap<String, SourceStats>>,
}

impl Recorder {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self {
            store,
            stats: RwLock::new(HashMap::new()),
        }
    }

    /// Record one upstream attempt outcome
    pub fn record_attempt(
        &self,
        source_id: u32,
        source_name: &str,
        success: bool,
        elapsed_ms: u64,
        status: Option<u16>,
        error: Option<&str>,
    ) {
        let snapshot = {
            let mut stats = self.stats.write().expect("recorder lock poisoned");
            let entry = stats
                .entry(source_name.to_string())
                .or_insert_with(|| SourceStats::new(source_name));
            entry.observe(success, elapsed_ms, status, error);
            entry.clone()
        };

        if let Err(err) = self.store.upsert_stats(&snapshot) {
            warn!(source_name, error = %err, "Failed to persist source stats");
        }

        let record = HealthCheckRecord {
            source_id,
            source_name: source_name.to_string(),
            healthy: success,
            response_time_ms: elapsed_ms,
            error_message: error.map(String::from),
            timestamp: Utc::now(),
        };
        if let Err(err) = self.store.log_health_check(&record) {
            warn!(source_name, error = %err, "Failed to persist health check");
        }
    }

    /// Append one completed dispatch to the request log
    pub fn record_request(&self, record: RequestRecord) {
        if let Err(err) = self.store.log_request(&record) {
            warn!(request_id = %record.id, error = %err, "Failed to persist request record");
        }
    }

    /// In-memory stats view, one entry per observed source
    pub fn stats_snapshot(&self) -> Vec<SourceStats> {
        let stats = self.stats.read().expect("recorder lock poisoned");
        let mut out: Vec<SourceStats> = stats.values().cloned().collect();
        out.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        out
    }
}
