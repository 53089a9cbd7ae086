//! Request/response value objects for the dispatcher
//!
//! `EnhancedResponse` and `ResponseMetadata` serde field names are the wire
//! contract consumed by front ends; changing them breaks compatibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::normalize::NormalizeError;

/// One logical inbound request; immutable for the duration of a dispatch
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub endpoint: String,
    pub category: String,
    pub params: HashMap<String, String>,
    pub client_ip: String,
    pub user_agent: String,
    pub started_at: Instant,
}

impl RequestContext {
    pub fn new(
        endpoint: impl Into<String>,
        category: impl Into<String>,
        params: HashMap<String, String>,
        client_ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            category: category.into(),
            params,
            client_ip: client_ip.into(),
            user_agent: user_agent.into(),
            started_at: Instant::now(),
        }
    }
}

/// Per-attempt value object, created fresh for each attempt
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub method: &'static str,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub source_name: String,
    pub priority: u32,
    pub is_fallback: bool,
}

/// Outcome of one upstream attempt
#[derive(Debug, Clone)]
pub struct ApiAttempt {
    pub source_name: String,
    pub url: String,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub is_fallback: bool,
}

/// Cache disposition of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    #[serde(rename = "HIT")]
    Hit,
    #[serde(rename = "MISS")]
    Miss,
    #[serde(rename = "BYPASS")]
    Bypass,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        };
        f.write_str(s)
    }
}

/// Dispatch metadata attached to every response (wire contract)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Winning source name, or `"cache"` on a hit
    pub source: String,
    /// URL that actually produced the payload; empty on a cache hit
    pub source_url: String,
    /// Every source with a started attempt, in attempt order
    pub all_sources: Vec<String>,
    pub category: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Elapsed time of the winning attempt
    pub response_time_ms: u64,
    /// End-to-end dispatch time
    pub total_time_ms: u64,
    pub attempts: u32,
    pub cache_status: CacheStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Caller-facing envelope (wire contract)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedResponse {
    pub data: serde_json::Value,
    pub metadata: ResponseMetadata,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Errors surfaced to the caller; everything else is absorbed by fallback
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no active sources configured for endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("all upstream sources failed for endpoint '{endpoint}' after {} attempts", attempted.len())]
    AllSourcesFailed {
        endpoint: String,
        attempted: Vec<String>,
        elapsed_ms: u64,
    },
}

/// Per-attempt failure, always recovered by advancing to the next source
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
}

impl AttemptError {
    /// HTTP status carried by the failure, where one exists
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_status_wire_format() {
        assert_eq!(serde_json::to_string(&CacheStatus::Hit).unwrap(), "\"HIT\"");
        assert_eq!(
            serde_json::to_string(&CacheStatus::Miss).unwrap(),
            "\"MISS\""
        );
        assert_eq!(
            serde_json::to_string(&CacheStatus::Bypass).unwrap(),
            "\"BYPASS\""
        );
    }

    #[test]
    fn test_enhanced_response_wire_fields() {
        let response = EnhancedResponse {
            data: json!({"title": "x"}),
            metadata: ResponseMetadata {
                source: "main_api".to_string(),
                source_url: "https://api.example.com/api/v1/home".to_string(),
                all_sources: vec!["main_api".to_string()],
                category: "anime".to_string(),
                endpoint: "/api/v1/home".to_string(),
                filter: None,
                response_time_ms: 40,
                total_time_ms: 45,
                attempts: 1,
                cache_status: CacheStatus::Miss,
                cache_key: Some("anime:/api/v1/home:abc".to_string()),
                timestamp: Utc::now(),
            },
            success: true,
            error: None,
            message: None,
        };

        let value = serde_json::to_value(&response).unwrap();
        let meta = &value["metadata"];

        for field in [
            "source",
            "source_url",
            "all_sources",
            "category",
            "endpoint",
            "response_time_ms",
            "total_time_ms",
            "attempts",
            "cache_status",
            "cache_key",
            "timestamp",
        ] {
            assert!(meta.get(field).is_some(), "missing wire field {field}");
        }
        assert_eq!(meta["cache_status"], "MISS");
        // Absent optionals are omitted, not null
        assert!(value.get("error").is_none());
        assert!(meta.get("filter").is_none());
    }
}
