//! HTTP Transport Abstraction
//!
//! Defines the connection-pool collaborator the request executor drives. The
//! transport issues exactly one wire request per call and reports completion
//! as a `(body?, response?, error?)` triple; retry, validation and callback
//! policy all live above this layer.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Wire-level verb string
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

/// A fully resolved wire-level request.
///
/// Headers are ordered; when the same name appears more than once the later
/// entry wins. The executor resolves relative paths before building one of
/// these, so `url` is always absolute.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl WireRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response metadata as received from the wire, before normalization.
///
/// Header names are kept as received; the core lower-cases them when it
/// builds an envelope.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// Final request URL (after any redirects)
    pub url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
}

/// Errors a transport can report, classified for retry policy.
///
/// Only `TimedOut` is considered transient by the executor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    TimedOut,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::TimedOut)
    }
}

/// Completion of one transport attempt.
///
/// Mirrors the platform completion contract: any of the three parts may be
/// absent. A reply can carry both a response and an error (e.g. the body read
/// failed after the status line arrived).
#[derive(Debug, Clone, Default)]
pub struct TransportReply {
    pub response: Option<WireResponse>,
    pub body: Option<Bytes>,
    pub error: Option<TransportError>,
}

impl TransportReply {
    pub fn failure(error: TransportError) -> Self {
        Self {
            response: None,
            body: None,
            error: Some(error),
        }
    }
}

/// Shared connection-pool configuration.
///
/// Replacing the configuration rebuilds the pool; requests already in flight
/// finish on the old pool. This is an accepted non-atomic transition, not a
/// safe hot-swap.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Total per-request timeout
    pub timeout: Duration,
    /// Connect-phase timeout
    pub connect_timeout: Duration,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    /// Headers applied to every request on this pool (auth, API keys)
    pub additional_headers: HashMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            user_agent: "http-client-core/0.1.0".to_string(),
            additional_headers: HashMap::new(),
        }
    }
}

/// Async HTTP transport trait
///
/// Implementations own the platform connection pool. They do not retry, do
/// not interpret status codes, and must never panic on wire failures - every
/// outcome is reported through [`TransportReply`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a single wire request and wait for completion.
    async fn send(&self, request: WireRequest) -> TransportReply;

    /// Number of requests currently in flight on this pool.
    ///
    /// Used by the core's network-activity indicator; an approximate value is
    /// acceptable.
    fn outstanding_requests(&self) -> usize;

    /// Tear down the pool and rebuild it from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the new pool cannot be constructed; the old pool
    /// stays active in that case.
    fn reconfigure(&self, config: &SessionConfig) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_builder() {
        let request = WireRequest::new(HttpMethod::Post, "https://example.com/v1/items")
            .header("Accept", "application/json")
            .header("X-Trace", "abc")
            .body(Bytes::from_static(b"{}"));

        assert_eq!(request.url, "https://example.com/v1/items");
        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_transport_error_classification() {
        assert!(TransportError::TimedOut.is_timeout());
        assert!(!TransportError::Connect("refused".into()).is_timeout());
        assert!(!TransportError::Other("tls".into()).is_timeout());
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.additional_headers.is_empty());
    }
}
