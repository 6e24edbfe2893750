//! HTTP Transport Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{
        HttpMethod, HttpTransport, SessionConfig, TransportError, TransportReply, WireRequest,
        WireResponse,
    },
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Reqwest-based transport implementation
///
/// Owns the shared connection pool. `reconfigure` replaces the pool with one
/// built from the new [`SessionConfig`]; requests already in flight finish on
/// the old pool, which reqwest drops once its last clone goes away.
pub struct ReqwestTransport {
    client: RwLock<Client>,
    in_flight: AtomicUsize,
}

impl ReqwestTransport {
    /// Create a transport with the default session configuration
    pub fn new() -> Self {
        Self::with_config(&SessionConfig::default()).expect("default session config is buildable")
    }

    /// Create a transport from an explicit session configuration
    pub fn with_config(config: &SessionConfig) -> Result<Self> {
        let client = Self::build_client(config)?;
        Ok(Self {
            client: RwLock::new(client),
            in_flight: AtomicUsize::new(0),
        })
    }

    fn build_client(config: &SessionConfig) -> Result<Client> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.additional_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                BridgeError::OperationFailed(format!("invalid session header name {name:?}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                BridgeError::OperationFailed(format!("invalid session header value: {e}"))
            })?;
            headers.insert(name, value);
        }

        Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("failed to build HTTP pool: {e}")))
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }

    fn classify_error(e: &reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::TimedOut
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }

    async fn send_inner(&self, request: WireRequest) -> TransportReply {
        // Clone the pool handle out of the lock so a reconfigure mid-request
        // cannot block, and this request stays pinned to the pool it started on.
        let client = self
            .client
            .read()
            .expect("transport pool lock poisoned")
            .clone();

        let method = Self::convert_method(request.method);
        let mut builder = client.request(method, &request.url);

        // Insert (not append) so a duplicated header name keeps the later value
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = match HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => name,
                Err(e) => {
                    return TransportReply::failure(TransportError::Other(format!(
                        "invalid header name {name:?}: {e}"
                    )))
                }
            };
            let value = match HeaderValue::from_str(value) {
                Ok(value) => value,
                Err(e) => {
                    return TransportReply::failure(TransportError::Other(format!(
                        "invalid header value for {name}: {e}"
                    )))
                }
            };
            headers.insert(name, value);
        }
        builder = builder.headers(headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        debug!(url = %request.url, "Issuing wire request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Wire request failed");
                return TransportReply::failure(Self::classify_error(&e));
            }
        };

        let metadata = WireResponse {
            url: response.url().to_string(),
            status: response.status().as_u16(),
            headers: response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
                .collect::<HashMap<_, _>>(),
        };

        match response.bytes().await {
            Ok(body) => TransportReply {
                response: Some(metadata),
                body: Some(body),
                error: None,
            },
            Err(e) => {
                warn!(url = %request.url, error = %e, "Reading response body failed");
                TransportReply {
                    response: Some(metadata),
                    body: None,
                    error: Some(Self::classify_error(&e)),
                }
            }
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> TransportReply {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let reply = self.send_inner(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }

    fn outstanding_requests(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn reconfigure(&self, config: &SessionConfig) -> Result<()> {
        let client = Self::build_client(config)?;
        let mut guard = self.client.write().expect("transport pool lock poisoned");
        *guard = client;
        debug!("Connection pool rebuilt from new session configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestTransport::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestTransport::convert_method(HttpMethod::Patch),
            reqwest::Method::PATCH
        );
    }

    #[test]
    fn test_reconfigure_rejects_bad_header() {
        let transport = ReqwestTransport::new();
        let mut config = SessionConfig::default();
        config
            .additional_headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(transport.reconfigure(&config).is_err());
    }

    #[tokio::test]
    async fn test_no_outstanding_requests_initially() {
        let transport = ReqwestTransport::new();
        assert_eq!(transport.outstanding_requests(), 0);
    }
}
