use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, Uri},
    response::IntoResponse,
};
use chrono::Utc;
use std::collections::HashMap;

use super::{models::HealthResponse, models::StatsResponse, state::AppState};
use crate::api::error::ApiError;
use crate::dispatch::{
    CacheStatus, DispatchError, EnhancedResponse, RequestContext, ResponseMetadata,
};

/// Gateway entry point (catch-all route)
///
/// Maps the request path to a configured endpoint, builds a
/// `RequestContext`, and runs one dispatch. Upstream exhaustion is still a
/// structured 200 response with `success=false`; only an unknown endpoint is
/// a transport-level 404.
pub async fn gateway(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let endpoint = uri.path().to_string();

    // Resolve category from configuration before dispatching; unknown paths
    // are a routing miss, not a dispatch failure
    let info = state
        .registry
        .endpoint(&endpoint)
        .ok_or_else(|| ApiError::UnknownEndpoint(endpoint.clone()))?;

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .unwrap_or("unknown")
        .trim()
        .to_string();

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let ctx = RequestContext::new(endpoint, info.category, params, client_ip, user_agent);

    match state.dispatcher.process_request(ctx.clone()).await {
        Ok(response) => Ok(Json(response)),
        Err(DispatchError::InvalidEndpoint(endpoint)) => {
            Err(ApiError::UnknownEndpoint(endpoint))
        }
        Err(error @ DispatchError::AllSourcesFailed { .. }) => {
            Ok(Json(failure_response(&ctx, &error)))
        }
    }
}

/// Build the structured failure envelope for an exhausted fallback chain
fn failure_response(ctx: &RequestContext, error: &DispatchError) -> EnhancedResponse {
    let (attempted, elapsed_ms) = match error {
        DispatchError::AllSourcesFailed {
            attempted,
            elapsed_ms,
            ..
        } => (attempted.clone(), *elapsed_ms),
        DispatchError::InvalidEndpoint(_) => (Vec::new(), 0),
    };

    EnhancedResponse {
        data: serde_json::Value::Null,
        metadata: ResponseMetadata {
            source: String::new(),
            source_url: String::new(),
            attempts: attempted.len() as u32,
            all_sources: attempted,
            category: ctx.category.clone(),
            endpoint: ctx.endpoint.clone(),
            filter: None,
            response_time_ms: 0,
            total_time_ms: elapsed_ms,
            cache_status: CacheStatus::Miss,
            cache_key: None,
            timestamp: Utc::now(),
        },
        success: false,
        error: Some(error.to_string()),
        message: Some("all configured sources are currently unavailable".to_string()),
    }
}

/// Health check endpoint (GET /health)
///
/// Reports the active cache backend and ledger reachability.
/// Returns 503 Service Unavailable if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();

    components.insert("api".to_string(), "healthy".to_string());
    components.insert("cache".to_string(), state.cache_backend.to_string());

    let ledger_status = match state.store.counts() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    components.insert("ledger".to_string(), ledger_status.to_string());

    let all_healthy = ledger_status == "healthy";
    let status_code = if all_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Usage statistics endpoint (GET /stats)
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let response = StatsResponse {
        metrics: state.metrics.snapshot(),
        sources: state.recorder.stats_snapshot(),
    };

    Json(response)
}
