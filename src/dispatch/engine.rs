//! The fallback engine
//!
//! One dispatch walks: cache check, then the ordered source sequence, one
//! attempt per source under the per-attempt timeout, first success wins.
//! The winning payload is normalized, cached, and wrapped in an
//! `EnhancedResponse` carrying attempt metadata. Upstream failures are never
//! fatal; only an exhausted chain or a configuration error reaches the
//! caller.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{self, Cache};
use crate::config::LimitsConfig;
use crate::ledger::RequestRecord;
use crate::normalize;
use crate::observability::Metrics;
use crate::recorder::Recorder;
use crate::registry::{ApiSource, SourceRegistry};

use super::limits::AdmissionControl;
use super::transport::Transport;
use super::types::{
    ApiAttempt, ApiRequest, AttemptError, CacheStatus, DispatchError, EnhancedResponse,
    RequestContext, ResponseMetadata,
};

pub struct Dispatcher {
    registry: Arc<SourceRegistry>,
    cache: Cache,
    transport: Arc<dyn Transport>,
    admission: AdmissionControl,
    recorder: Arc<Recorder>,
    metrics: Arc<Metrics>,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SourceRegistry>,
        cache: Cache,
        transport: Arc<dyn Transport>,
        recorder: Arc<Recorder>,
        metrics: Arc<Metrics>,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            transport,
            admission: AdmissionControl::new(limits.max_concurrency, limits.rate_limit_per_sec),
            recorder,
            metrics,
            request_timeout: limits.request_timeout.as_duration(),
        }
    }

    /// Resolve one request against the fallback chain
    pub async fn process_request(
        &self,
        ctx: RequestContext,
    ) -> Result<EnhancedResponse, DispatchError> {
        self.metrics.dispatch_started();

        // Concurrency gate covers the whole dispatch; the permit is RAII so
        // the slot frees on every exit path including cancellation
        let _permit = self.admission.admit().await;

        let info = self
            .registry
            .endpoint(&ctx.endpoint)
            .ok_or_else(|| DispatchError::InvalidEndpoint(ctx.endpoint.clone()))?;

        let cache_key = cache::generate_key(&ctx.category, &ctx.endpoint, &ctx.params);
        let bypass = info.cache_ttl.is_zero();

        if !bypass {
            if let Some(hit) = self.cache.get(&cache_key).await {
                match serde_json::from_slice::<Value>(&hit) {
                    Ok(data) => {
                        self.metrics.cache_hit();
                        debug!(key = %cache_key, "Cache hit, skipping dispatch");
                        let response = self.hit_response(&ctx, data, cache_key);
                        self.log_dispatch(&ctx, &response);
                        return Ok(response);
                    }
                    Err(error) => {
                        warn!(key = %cache_key, %error, "Undecodable cache entry, evicting");
                        self.cache.delete(&cache_key).await;
                    }
                }
            }
            self.metrics.cache_miss();
        }

        let sources = self.registry.sources_for(&ctx.endpoint).unwrap_or_default();
        if sources.is_empty() {
            return Err(DispatchError::InvalidEndpoint(ctx.endpoint.clone()));
        }

        // The rate budget covers outbound attempts only; cache hits have
        // already returned by this point
        if self.admission.acquire_rate_budget().await {
            self.metrics.rate_limited();
        }

        let mut attempted: Vec<String> = Vec::new();
        let mut winner: Option<(ApiSource, String, Value, u64)> = None;

        for source in sources {
            let request = self.build_request(&ctx, &source);
            attempted.push(source.name.clone());

            let started = Instant::now();
            let outcome = self.attempt(&request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok((data, status)) => {
                    self.observe_attempt(
                        &source,
                        ApiAttempt {
                            source_name: request.source_name.clone(),
                            url: request.url.clone(),
                            status: Some(status),
                            elapsed_ms,
                            error: None,
                            is_fallback: request.is_fallback,
                        },
                    );
                    winner = Some((source, request.url, data, elapsed_ms));
                    break;
                }
                Err(error) => {
                    self.metrics.upstream_failure();
                    warn!(
                        source = %source.name,
                        url = %request.url,
                        %error,
                        "Upstream attempt failed, advancing to next source"
                    );
                    self.observe_attempt(
                        &source,
                        ApiAttempt {
                            source_name: request.source_name.clone(),
                            url: request.url,
                            status: error.status(),
                            elapsed_ms,
                            error: Some(error.to_string()),
                            is_fallback: request.is_fallback,
                        },
                    );
                }
            }
        }

        let Some((source, url, data, response_time_ms)) = winner else {
            self.metrics.dispatch_exhausted();
            let elapsed_ms = ctx.started_at.elapsed().as_millis() as u64;
            self.log_failure(&ctx, &attempted, elapsed_ms);
            return Err(DispatchError::AllSourcesFailed {
                endpoint: ctx.endpoint.clone(),
                attempted,
                elapsed_ms,
            });
        };

        // Populate only on a genuine upstream success
        if !bypass {
            match serde_json::to_vec(&data) {
                Ok(bytes) => self.cache.set(&cache_key, bytes, info.cache_ttl).await,
                Err(error) => warn!(key = %cache_key, %error, "Failed to encode cache value"),
            }
        }

        let cache_status = if bypass {
            CacheStatus::Bypass
        } else {
            CacheStatus::Miss
        };

        let response = EnhancedResponse {
            data,
            metadata: ResponseMetadata {
                source: source.name,
                source_url: url,
                all_sources: attempted.clone(),
                category: ctx.category.clone(),
                endpoint: ctx.endpoint.clone(),
                filter: filter_description(&ctx.params),
                response_time_ms,
                total_time_ms: ctx.started_at.elapsed().as_millis() as u64,
                attempts: attempted.len() as u32,
                cache_status,
                cache_key: (!bypass).then_some(cache_key),
                timestamp: Utc::now(),
            },
            success: true,
            error: None,
            message: None,
        };

        self.log_dispatch(&ctx, &response);
        Ok(response)
    }

    /// One upstream attempt: transport call, status check, normalization
    async fn attempt(&self, request: &ApiRequest) -> Result<(Value, u16), AttemptError> {
        let fetched = self.transport.send(request).await?;

        if !(200..300).contains(&fetched.status) {
            return Err(AttemptError::Status(fetched.status));
        }

        let data = normalize::normalize(&fetched.body, &request.source_name)?;
        Ok((data, fetched.status))
    }

    fn build_request(&self, ctx: &RequestContext, source: &ApiSource) -> ApiRequest {
        ApiRequest {
            url: build_url(&source.base_url, &ctx.endpoint, &ctx.params),
            method: "GET",
            headers: Vec::new(),
            timeout: self.request_timeout,
            source_name: source.name.clone(),
            priority: source.priority,
            is_fallback: !source.is_primary,
        }
    }

    fn hit_response(
        &self,
        ctx: &RequestContext,
        data: Value,
        cache_key: String,
    ) -> EnhancedResponse {
        EnhancedResponse {
            data,
            metadata: ResponseMetadata {
                source: "cache".to_string(),
                source_url: String::new(),
                all_sources: Vec::new(),
                category: ctx.category.clone(),
                endpoint: ctx.endpoint.clone(),
                filter: filter_description(&ctx.params),
                response_time_ms: 0,
                total_time_ms: ctx.started_at.elapsed().as_millis() as u64,
                attempts: 0,
                cache_status: CacheStatus::Hit,
                cache_key: Some(cache_key),
                timestamp: Utc::now(),
            },
            success: true,
            error: None,
            message: None,
        }
    }

    /// Feed the recorder off the hot path
    fn observe_attempt(&self, source: &ApiSource, attempt: ApiAttempt) {
        let recorder = Arc::clone(&self.recorder);
        let source_id = source.id;
        tokio::spawn(async move {
            recorder.record_attempt(
                source_id,
                &attempt.source_name,
                attempt.error.is_none(),
                attempt.elapsed_ms,
                attempt.status,
                attempt.error.as_deref(),
            );
        });
    }

    fn log_dispatch(&self, ctx: &RequestContext, response: &EnhancedResponse) {
        let record = RequestRecord {
            id: Uuid::now_v7().to_string(),
            category: ctx.category.clone(),
            endpoint: ctx.endpoint.clone(),
            source: response.metadata.source.clone(),
            cache_status: response.metadata.cache_status.to_string(),
            success: response.success,
            attempts: response.metadata.attempts,
            total_time_ms: response.metadata.total_time_ms,
            client_ip: ctx.client_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            timestamp: Utc::now(),
        };
        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move { recorder.record_request(record) });
    }

    fn log_failure(&self, ctx: &RequestContext, attempted: &[String], elapsed_ms: u64) {
        let record = RequestRecord {
            id: Uuid::now_v7().to_string(),
            category: ctx.category.clone(),
            endpoint: ctx.endpoint.clone(),
            source: String::new(),
            cache_status: CacheStatus::Miss.to_string(),
            success: false,
            attempts: attempted.len() as u32,
            total_time_ms: elapsed_ms,
            client_ip: ctx.client_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            timestamp: Utc::now(),
        };
        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move { recorder.record_request(record) });
    }
}

/// Concatenate base URL, endpoint path, and canonically ordered query string
fn build_url(
    base_url: &str,
    endpoint: &str,
    params: &std::collections::HashMap<String, String>,
) -> String {
    let mut url = format!("{}{}", base_url.trim_end_matches('/'), endpoint);

    if !params.is_empty() {
        let canonical: BTreeMap<&str, &str> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let query: Vec<String> = canonical
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        url.push('?');
        url.push_str(&query.join("&"));
    }

    url
}

/// Human-readable description of the applied parameters
fn filter_description(params: &std::collections::HashMap<String, String>) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let canonical: BTreeMap<&str, &str> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let parts: Vec<String> = canonical
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    Some(parts.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_url_no_params() {
        let url = build_url("https://api.example.com", "/api/v1/home", &HashMap::new());
        assert_eq!(url, "https://api.example.com/api/v1/home");
    }

    #[test]
    fn test_build_url_trailing_slash() {
        let url = build_url("https://api.example.com/", "/api/v1/home", &HashMap::new());
        assert_eq!(url, "https://api.example.com/api/v1/home");
    }

    #[test]
    fn test_build_url_params_sorted_and_encoded() {
        let url = build_url(
            "https://api.example.com",
            "/api/v1/search",
            &params(&[("q", "one two"), ("page", "1")]),
        );
        assert_eq!(url, "https://api.example.com/api/v1/search?page=1&q=one%20two");
    }

    #[test]
    fn test_filter_description() {
        assert_eq!(filter_description(&HashMap::new()), None);
        assert_eq!(
            filter_description(&params(&[("sort", "asc"), ("page", "2")])),
            Some("page=2&sort=asc".to_string())
        );
    }
}
