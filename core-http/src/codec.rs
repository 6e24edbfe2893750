//! Typed JSON coding of response envelopes.
//!
//! [`JsonCoder`] turns envelopes into [`ApiResult`]s carrying a typed object,
//! with a configurable date format for API timestamps. Decode failures are
//! logged and surfaced as result fields; they are never raised across the
//! call boundary, and the envelope's original bytes stay available.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::response::HttpResponse;
use crate::status::HttpStatusCode;

/// Date pattern used by the API by default: fixed ISO-8601-like, UTC.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Serde helper for `DateTime<Utc>` fields in the default API date format.
///
/// ```ignore
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Profile {
///     name: String,
///     #[serde(with = "core_http::codec::api_date")]
///     created_at: chrono::DateTime<chrono::Utc>,
/// }
/// ```
pub mod api_date {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DEFAULT_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let value = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&value, DEFAULT_DATE_FORMAT)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("JSON encoding failed: {0}")]
    Encode(String),

    #[error("JSON decoding failed: {0}")]
    Decode(String),

    #[error("date parsing failed: {0}")]
    Date(String),
}

/// Error attached to an [`ApiResult`]: either the decode step failed or the
/// envelope itself carried a transport error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] bridge_traits::http::TransportError),
}

/// Result of one API transaction, combining envelope metadata with the
/// decoded object.
#[derive(Debug)]
pub struct ApiResult<T> {
    /// Whether the transaction succeeded
    pub is_success: bool,
    /// Status code of the response
    pub status: HttpStatusCode,
    /// Response headers, lower-cased keys
    pub headers: HashMap<String, String>,
    /// Info message from the SDK or backend services
    pub message: String,
    /// Decoded object, absent when the body was missing or undecodable
    pub object: Option<T>,
    /// Error behind the transaction, if any
    pub error: Option<ApiError>,
}

impl<T> ApiResult<T> {
    fn from_envelope(response: &HttpResponse, is_success: bool) -> Self {
        Self {
            is_success,
            status: response.status,
            headers: response.headers.clone(),
            message: String::new(),
            object: None,
            error: None,
        }
    }
}

/// JSON codec with a pluggable date format.
#[derive(Debug, Clone)]
pub struct JsonCoder {
    date_format: String,
}

impl JsonCoder {
    pub fn new() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Use a custom chrono format string for [`format_date`](Self::format_date)
    /// and [`parse_date`](Self::parse_date).
    pub fn with_date_format(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Format a timestamp with this coder's date pattern.
    pub fn format_date(&self, date: &DateTime<Utc>) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Parse a timestamp with this coder's date pattern.
    pub fn parse_date(&self, value: &str) -> Result<DateTime<Utc>, CodecError> {
        NaiveDateTime::parse_from_str(value, &self.date_format)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|e| CodecError::Date(e.to_string()))
    }

    /// Encode a value to JSON bytes.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CodecError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| {
                warn!(error = %e, "JSON encoding failed");
                CodecError::Encode(e.to_string())
            })
    }

    /// Decode a value from JSON bytes.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| {
            warn!(error = %e, "JSON decoding failed");
            CodecError::Decode(e.to_string())
        })
    }

    /// Decode a success envelope's body into a typed result.
    ///
    /// Deserialization runs off the async executor. A missing body yields a
    /// successful result without an object; an undecodable body keeps
    /// `is_success` but records the decode error and a message naming the URL.
    pub async fn decode_success<T>(&self, response: &HttpResponse) -> ApiResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut result = ApiResult::from_envelope(response, true);

        let Some(body) = response.body.clone() else {
            return result;
        };

        let decoded =
            tokio::task::spawn_blocking(move || serde_json::from_slice::<T>(&body)).await;
        match decoded {
            Ok(Ok(object)) => result.object = Some(object),
            Ok(Err(e)) => {
                let url = response
                    .url
                    .as_ref()
                    .map(|u| u.as_str())
                    .unwrap_or_default();
                warn!(url = url, error = %e, "Decoding response failed");
                result.message = format!("Decoding response from {url} failed");
                result.error = Some(CodecError::Decode(e.to_string()).into());
            }
            Err(e) => {
                warn!(error = %e, "Decode task failed");
                result.error = Some(CodecError::Decode(e.to_string()).into());
            }
        }
        result
    }

    /// Build a typed result from an error envelope.
    ///
    /// The body, when readable as UTF-8, becomes the result message so
    /// backend error payloads stay visible to callers.
    pub async fn decode_error<T>(&self, response: &HttpResponse) -> ApiResult<T> {
        let mut result = ApiResult::from_envelope(response, false);

        if let Some(body) = &response.body {
            if let Ok(message) = std::str::from_utf8(body) {
                result.message = message.to_string();
            }
        }
        result.error = response.error.clone().map(ApiError::from);
        result
    }
}

impl Default for JsonCoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::WireResponse;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Profile {
        name: String,
        #[serde(with = "api_date")]
        created_at: DateTime<Utc>,
    }

    fn envelope(status: u16, content_type: &str, body: &str) -> HttpResponse {
        let wire = WireResponse {
            url: "https://api.example.com/v1/profile".to_string(),
            status,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                content_type.to_string(),
            )]),
        };
        HttpResponse::from_wire(wire, Some(Bytes::from(body.to_string())), None)
    }

    #[test]
    fn test_date_round_trip() {
        let coder = JsonCoder::new();
        let formatted = "2017-09-09T13:00:00.000Z";
        let parsed = coder.parse_date(formatted).unwrap();
        assert_eq!(coder.format_date(&parsed), formatted);
        assert_eq!(parsed.timestamp(), 1504962000);
    }

    #[test]
    fn test_custom_date_format() {
        let coder = JsonCoder::with_date_format("%Y-%m-%d %H:%M:%S");
        let parsed = coder.parse_date("2024-02-29 10:30:00").unwrap();
        assert_eq!(coder.format_date(&parsed), "2024-02-29 10:30:00");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let coder = JsonCoder::new();
        let profile = Profile {
            name: "Nyhavn".to_string(),
            created_at: coder.parse_date("2017-09-09T13:00:00.000Z").unwrap(),
        };
        let bytes = coder.encode(&profile).unwrap();
        let decoded: Profile = coder.decode(&bytes).unwrap();
        assert_eq!(decoded, profile);
    }

    #[tokio::test]
    async fn test_decode_success_typed() {
        let coder = JsonCoder::new();
        let response = envelope(
            200,
            "application/json",
            r#"{"name":"Nyhavn","created_at":"2017-09-09T13:00:00.000Z"}"#,
        );

        let result: ApiResult<Profile> = coder.decode_success(&response).await;
        assert!(result.is_success);
        assert_eq!(result.status, HttpStatusCode::Ok);
        assert_eq!(result.object.as_ref().map(|p| p.name.as_str()), Some("Nyhavn"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_decode_success_bad_body_surfaces_error() {
        let coder = JsonCoder::new();
        let response = envelope(200, "application/json", "{broken");

        let result: ApiResult<Profile> = coder.decode_success(&response).await;
        assert!(result.is_success);
        assert!(result.object.is_none());
        assert!(matches!(result.error, Some(ApiError::Codec(_))));
        assert!(result.message.contains("api.example.com"));
        // Original bytes are still on the envelope
        assert_eq!(response.body.as_deref(), Some(&b"{broken"[..]));
    }

    #[tokio::test]
    async fn test_decode_error_carries_body_message() {
        let coder = JsonCoder::new();
        let response = envelope(503, "text/plain", "maintenance window");

        let result: ApiResult<Profile> = coder.decode_error(&response).await;
        assert!(!result.is_success);
        assert_eq!(result.status, HttpStatusCode::ServiceUnavailable);
        assert_eq!(result.message, "maintenance window");
        assert!(result.object.is_none());
    }
}
