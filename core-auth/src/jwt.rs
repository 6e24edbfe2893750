//! JSON Web Token payload decoding.
//!
//! Decodes the payload segment of a compact JWT into its registered claims.
//! No signature verification is performed here; the backend owns token
//! authenticity, this component only needs the expiry claim.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::JwtError;

/// Decoded JWT payload claims.
#[derive(Debug, Clone, Default)]
pub struct JwtPayload {
    /// Issuer (iss) - principal that issued the JWT
    pub issuer: Option<String>,

    /// Subject (sub) - the subject of the JWT
    pub subject: Option<String>,

    /// Audience (aud) - recipients the JWT is intended for
    pub audience: Option<String>,

    /// Expiration time (exp) - time on or after which the JWT must not be
    /// accepted for processing
    pub expiration: Option<DateTime<Utc>>,

    /// Not before (nbf) - time at which the JWT starts being accepted
    pub not_before: Option<DateTime<Utc>>,

    /// Issued at (iat) - time at which the JWT was issued
    pub issued_at: Option<DateTime<Utc>>,

    /// JWT ID (jti) - case-sensitive unique identifier of the token
    pub unique_id: Option<String>,

    /// Raw payload object, including private claims
    pub raw: Map<String, Value>,
}

/// Decode a compact JWT's payload segment.
///
/// The token is split on `.` into header, payload and signature; segments
/// past the third are ignored. Numeric `iat`/`nbf`/`exp` claims are
/// interpreted as Unix-epoch seconds.
///
/// # Errors
///
/// Returns a [`JwtError`] naming the decode failure: fewer than three
/// segments, a payload that isn't valid base64url, or payload bytes that are
/// not a JSON object.
pub fn decode_payload(token: &str) -> Result<JwtPayload, JwtError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() < 3 {
        return Err(JwtError::NotEnoughSegments);
    }

    let payload_bytes =
        base64url_decode(segments[1]).map_err(|e| JwtError::InvalidBase64(e.to_string()))?;

    let value: Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| JwtError::InvalidPayload(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(JwtError::InvalidPayload(
            "payload is not a JSON object".to_string(),
        ));
    };

    Ok(JwtPayload {
        issuer: string_claim(&object, "iss"),
        subject: string_claim(&object, "sub"),
        audience: string_claim(&object, "aud"),
        unique_id: string_claim(&object, "jti"),
        issued_at: numeric_date(object.get("iat")),
        not_before: numeric_date(object.get("nbf")),
        expiration: numeric_date(object.get("exp")),
        raw: object,
    })
}

/// Decode a base64url string, tolerating both padded and unpadded input.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))
}

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

fn string_claim(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key)?.as_str().map(str::to_string)
}

fn numeric_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let seconds = value?.as_f64()?;
    DateTime::from_timestamp(seconds as i64, 0)
}
