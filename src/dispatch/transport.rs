//! HTTP transport for upstream attempts
//!
//! The dispatcher only depends on the `Transport` contract: send a request
//! under its timeout, get status + body + elapsed back. Tests substitute a
//! scripted implementation; production uses reqwest.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::{ApiRequest, AttemptError};

/// Completed HTTP exchange; status is reported as-is, success is judged by
/// the dispatcher
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Bytes,
    pub elapsed: Duration,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<Fetched, AttemptError>;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("apirelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, AttemptError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Fetched, AttemptError> {
        debug!(url = %request.url, source = %request.source_name, "Starting upstream attempt");
        let started = Instant::now();

        let mut builder = self
            .client
            .get(&request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Transport(format!("failed to read body: {}", e))
            }
        })?;

        let elapsed = started.elapsed();
        debug!(
            url = %request.url,
            status,
            size = body.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Upstream attempt completed"
        );

        Ok(Fetched {
            status,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.user_agent.starts_with("apirelay/"));
    }

    #[test]
    fn test_transport_builds() {
        assert!(HttpTransport::new(HttpConfig::default()).is_ok());
    }
}
