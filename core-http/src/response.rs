//! Response envelope.
//!
//! The normalized result of executing a call, decoupled from the transport's
//! native response type. Header keys are lower-cased for case-insensitive
//! lookup, and the deserialized JSON body is cached so it is computed at most
//! once per envelope; clones share the cache.

use bridge_traits::http::{TransportError, WireResponse};
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

use crate::status::HttpStatusCode;
use crate::types::ContentType;

/// Http response data
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// URL for the response; absent only for pre-flight validation failures
    pub url: Option<Url>,
    /// Status code, synthetic for local failure classes
    pub status: HttpStatusCode,
    /// Response headers with lower-cased keys
    pub headers: HashMap<String, String>,
    /// Content type derived from the response MIME string
    pub content_type: Option<ContentType>,
    /// Response body
    pub body: Option<Bytes>,
    /// Underlying transport error, if any
    pub error: Option<TransportError>,

    // Deserialized JSON body, parsed at most once per envelope. Clones share
    // the cell, so a value cached through any copy is visible to all.
    json_cache: Arc<OnceCell<Option<Value>>>,
}

impl HttpResponse {
    pub fn new(
        url: Option<Url>,
        status: HttpStatusCode,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            url,
            status,
            headers,
            content_type: None,
            body: None,
            error: None,
            json_cache: Arc::new(OnceCell::new()),
        }
    }

    /// Synthetic envelope for a URL that could not be built.
    pub(crate) fn invalid_url(url: Option<Url>) -> Self {
        Self::new(url, HttpStatusCode::InvalidUrl, HashMap::new())
    }

    /// Synthetic envelope for the reachability gate.
    pub(crate) fn no_internet(url: Url) -> Self {
        Self::new(Some(url), HttpStatusCode::NoInternet, HashMap::new())
    }

    /// Synthetic envelope for a completion that produced no usable response.
    pub(crate) fn unknown_status(url: Option<Url>, error: Option<TransportError>) -> Self {
        let mut response = Self::new(url, HttpStatusCode::UnknownStatus, HashMap::new());
        response.error = error;
        response
    }

    /// Build an envelope from wire metadata, normalizing headers and deriving
    /// the content type from the MIME string.
    pub(crate) fn from_wire(
        wire: WireResponse,
        body: Option<Bytes>,
        error: Option<TransportError>,
    ) -> Self {
        let headers = lower_case_headers(wire.headers);
        let content_type = headers
            .get("content-type")
            .map(|mime| ContentType::from_mime(Some(mime)));

        let mut response = Self::new(
            Url::parse(&wire.url).ok(),
            HttpStatusCode::from_code(wire.status as i32),
            headers,
        );
        response.content_type = content_type;
        response.body = body;
        response.error = error;
        response
    }

    /// Whether the envelope represents a completed request with a status in
    /// the success range and no transport error attached.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_success_range()
    }

    /// Deserialized JSON body.
    ///
    /// Parses at most once per envelope; later calls (and calls on clones, or
    /// through [`json_async`](Self::json_async)) return the cached value.
    /// Returns `None` when the body is absent, the content type is not JSON,
    /// or parsing fails.
    pub fn json(&self) -> Option<&Value> {
        if self.json_cache.get().is_none() {
            // A concurrent initializer may win the set; the cached value is
            // used either way.
            let _ = self.json_cache.set(self.deserialize_json());
        }
        self.json_cache.get().and_then(|cached| cached.as_ref())
    }

    /// Deserialized JSON body, parsed off the async executor.
    ///
    /// Suited for large payloads; shares the same single-parse cache as
    /// [`json`](Self::json).
    pub async fn json_async(&self) -> Option<&Value> {
        let body = self.json_eligible_body();
        let cached = self
            .json_cache
            .get_or_init(|| async move {
                let body = body?;
                match tokio::task::spawn_blocking(move || serde_json::from_slice::<Value>(&body))
                    .await
                {
                    Ok(Ok(value)) => Some(value),
                    Ok(Err(e)) => {
                        warn!(error = %e, "JSON deserialization failed");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "JSON deserialization task failed");
                        None
                    }
                }
            })
            .await;
        cached.as_ref()
    }

    /// Look up a value in the JSON body by comma-separated key path,
    /// e.g. `"country,city,address"`.
    pub async fn json_value(&self, key_path: &str) -> Option<Value> {
        let mut value = self.json_async().await?;
        for key in key_path.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            value = value.get(key)?;
        }
        Some(value.clone())
    }

    /// Log the envelope at debug level for diagnostics. Never includes the
    /// body or credential headers.
    pub fn log_response(&self, include_headers: bool) {
        let url = self.url.as_ref().map(Url::as_str).unwrap_or("<none>");
        debug!(
            url = url,
            status = %self.status,
            content_type = ?self.content_type,
            body_bytes = self.body.as_ref().map(Bytes::len).unwrap_or(0),
            "HTTP response"
        );
        if include_headers {
            for (name, value) in &self.headers {
                if name == "authorization" || name == "cookie" || name == "set-cookie" {
                    debug!(header = name.as_str(), value = "<redacted>");
                } else {
                    debug!(header = name.as_str(), value = value.as_str());
                }
            }
        }
    }

    fn json_eligible_body(&self) -> Option<Bytes> {
        if self.content_type != Some(ContentType::Json) {
            return None;
        }
        self.body.clone()
    }

    fn deserialize_json(&self) -> Option<Value> {
        let body = self.json_eligible_body()?;
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "JSON deserialization failed");
                None
            }
        }
    }
}

fn lower_case_headers(headers: HashMap<String, String>) -> HashMap<String, String> {
    headers
        .into_iter()
        .map(|(name, value)| (name.to_lowercase(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_envelope(body: &'static str) -> HttpResponse {
        let wire = WireResponse {
            url: "https://api.example.com/items".to_string(),
            status: 200,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )]),
        };
        HttpResponse::from_wire(wire, Some(Bytes::from_static(body.as_bytes())), None)
    }

    #[test]
    fn test_from_wire_normalizes() {
        let wire = WireResponse {
            url: "https://api.example.com/items".to_string(),
            status: 404,
            headers: HashMap::from([
                ("Content-Type".to_string(), "text/html".to_string()),
                ("X-Request-Id".to_string(), "abc123".to_string()),
            ]),
        };
        let response = HttpResponse::from_wire(wire, None, None);

        assert_eq!(response.status, HttpStatusCode::NotFound);
        assert_eq!(response.content_type, Some(ContentType::Html));
        assert_eq!(
            response.headers.get("x-request-id"),
            Some(&"abc123".to_string())
        );
        assert!(!response.headers.contains_key("X-Request-Id"));
    }

    #[test]
    fn test_json_parses_and_caches() {
        let response = json_envelope(r#"{"name":"bootstrap","id":2126244}"#);

        let first = response.json().expect("body should parse") as *const Value;
        let second = response.json().expect("cached value") as *const Value;
        assert_eq!(first, second);

        assert_eq!(
            response.json().and_then(|v| v.get("name")),
            Some(&Value::String("bootstrap".to_string()))
        );
    }

    #[tokio::test]
    async fn test_sync_then_async_share_cache() {
        let response = json_envelope(r#"{"id": 7}"#);

        let sync_ptr = response.json().expect("parse") as *const Value;
        let async_ptr = response.json_async().await.expect("cached") as *const Value;
        assert_eq!(sync_ptr, async_ptr);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let response = json_envelope(r#"{"id": 7}"#);
        let clone = response.clone();

        let original_ptr = response.json().expect("parse") as *const Value;
        let clone_ptr = clone.json_async().await.expect("cached") as *const Value;
        assert_eq!(original_ptr, clone_ptr);
    }

    #[test]
    fn test_json_requires_json_content_type() {
        let wire = WireResponse {
            url: "https://api.example.com/page".to_string(),
            status: 200,
            headers: HashMap::from([("Content-Type".to_string(), "text/html".to_string())]),
        };
        let response =
            HttpResponse::from_wire(wire, Some(Bytes::from_static(b"{\"a\":1}")), None);
        assert!(response.json().is_none());
    }

    #[test]
    fn test_malformed_json_yields_none() {
        let response = json_envelope("{not json");
        assert!(response.json().is_none());
        // Failure is cached too; no re-parse on second access
        assert!(response.json().is_none());
    }

    #[tokio::test]
    async fn test_json_value_key_path() {
        let response = json_envelope(r#"{"country":{"city":{"address":"Nyhavn 1"}}}"#);
        let address = response.json_value("country, city, address").await;
        assert_eq!(address, Some(Value::String("Nyhavn 1".to_string())));

        assert!(response.json_value("country,missing").await.is_none());
    }

    #[test]
    fn test_synthetic_envelopes() {
        let no_internet =
            HttpResponse::no_internet(Url::parse("https://api.example.com").unwrap());
        assert_eq!(no_internet.status, HttpStatusCode::NoInternet);
        assert!(no_internet.headers.is_empty());

        let invalid = HttpResponse::invalid_url(None);
        assert_eq!(invalid.status, HttpStatusCode::InvalidUrl);
        assert!(invalid.url.is_none());
        assert!(!invalid.is_success());
    }
}
