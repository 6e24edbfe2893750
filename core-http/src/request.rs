//! Request descriptor.
//!
//! An [`HttpRequest`] describes one logical HTTP call: relative path, verb,
//! optional content type, headers, body, and the content type the caller
//! expects back. The retry counter is executor-internal; callers never set it
//! and it resets to zero for every fresh call.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::http::HttpMethod;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::{HttpError, Result};
use crate::types::ContentType;

/// Http request parameters and configuration
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Relative URL path for the request
    path: String,
    /// Http method for the request
    method: HttpMethod,
    /// Content type set on the outgoing request, optional
    pub content_type: Option<ContentType>,
    /// Custom headers; duplicate names keep the value set last
    pub headers: HashMap<String, String>,
    /// Request body, optional
    pub body: Option<Bytes>,
    /// Expected response content type, used for response validation, optional
    pub expected_response_content_type: Option<ContentType>,
    /// How many retries were performed on this call chain. Only the executor
    /// increments this.
    retries_count: u32,
}

impl HttpRequest {
    /// Create a descriptor for `path` with the given method.
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            content_type: None,
            headers: HashMap::new(),
            body: None,
            expected_response_content_type: None,
            retries_count: 0,
        }
    }

    /// Convenience constructor for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path, HttpMethod::Get)
    }

    /// Convenience constructor for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path, HttpMethod::Post)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn retries_count(&self) -> u32 {
        self.retries_count
    }

    /// Derive the descriptor for the next retry attempt.
    pub(crate) fn next_retry(mut self) -> Self {
        self.retries_count += 1;
        self
    }

    /// Set the outgoing content type.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Add a custom header. Setting the same name again replaces the value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Require the response to carry this content type to count as success.
    pub fn expect_content_type(mut self, content_type: ContentType) -> Self {
        self.expected_response_content_type = Some(content_type);
        self
    }

    /// Serialize `value` as the JSON body and tag the request accordingly.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| HttpError::Configuration(format!("JSON serialization failed: {e}")))?;
        self.body = Some(Bytes::from(body));
        self.content_type = Some(ContentType::Json);
        Ok(self)
    }

    /// Build a relative path carrying percent-encoded query pairs.
    ///
    /// ```
    /// use core_http::HttpRequest;
    ///
    /// let path = HttpRequest::path_with_query("search", &[("q", "rust"), ("page", "2")]);
    /// assert_eq!(path, "search?q=rust&page=2");
    /// ```
    pub fn path_with_query(path: &str, query: &[(&str, &str)]) -> String {
        if query.is_empty() {
            return path.to_string();
        }
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().copied())
            .finish();
        format!("{path}?{encoded}")
    }

    /// Generate a basic authentication header from user name and password.
    ///
    /// Returns `None` if either value is empty after trimming whitespace.
    pub fn basic_auth_header(user_name: &str, password: &str) -> Option<(String, String)> {
        let user_name = user_name.trim();
        let password = password.trim();
        if user_name.is_empty() || password.is_empty() {
            return None;
        }

        let encoded = STANDARD.encode(format!("{user_name}:{password}"));
        Some(("Authorization".to_string(), format!("Basic {encoded}")))
    }

    /// Add a basic authentication header to this request.
    ///
    /// Prefer [`SessionConfig::additional_headers`](bridge_traits::http::SessionConfig)
    /// for session-wide basic authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if user name or password is empty.
    pub fn basic_auth(mut self, user_name: &str, password: &str) -> Result<Self> {
        let (name, value) = Self::basic_auth_header(user_name, password).ok_or_else(|| {
            HttpError::InvalidCredentials("user name and password must be non-empty".to_string())
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

impl Default for HttpRequest {
    /// An empty-path GET request, useful when the session base URL is the
    /// whole target.
    fn default() -> Self {
        Self::get("")
    }
}
