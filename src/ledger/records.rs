//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed dispatch, appended after the response is returned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub category: String,
    pub endpoint: String,
    /// Winning source name, `"cache"` on a hit, empty when all failed
    pub source: String,
    pub cache_status: String,
    pub success: bool,
    pub attempts: u32,
    pub total_time_ms: u64,
    pub client_ip: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a single upstream attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckRecord {
    pub source_id: u32,
    pub source_name: String,
    pub healthy: bool,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate per-source counters; created on first observation, updated on
/// every attempt, never deleted during process lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStats {
    pub source_name: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_response_ms: u64,
    pub avg_response_ms: f64,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl SourceStats {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            attempts: 0,
            successes: 0,
            failures: 0,
            total_response_ms: 0,
            avg_response_ms: 0.0,
            last_status: None,
            last_error: None,
            last_seen: Utc::now(),
        }
    }

    /// Fold one attempt outcome into the running counters
    pub fn observe(
        &mut self,
        success: bool,
        elapsed_ms: u64,
        status: Option<u16>,
        error: Option<&str>,
    ) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_response_ms += elapsed_ms;
        self.avg_response_ms = self.total_response_ms as f64 / self.attempts as f64;
        self.last_status = status;
        self.last_error = error.map(String::from);
        self.last_seen = Utc::now();
    }
}
