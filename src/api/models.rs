//! API response models for the operational surfaces

use serde::Serialize;
use std::collections::HashMap;

use crate::ledger::SourceStats;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub metrics: MetricsSnapshot,
    pub sources: Vec<SourceStats>,
}
