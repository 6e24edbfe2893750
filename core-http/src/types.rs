//! Content-type modeling shared by descriptors and envelopes.

use std::fmt;

/// HTTP content type tag.
///
/// Derived from MIME strings with contains-style matching, so parameters like
/// `; charset=utf-8` don't affect classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `application/x-www-form-urlencoded`
    UrlEncoded,
    /// `application/json`
    Json,
    /// `text/xml` or `application/xml`
    Xml,
    /// `text/html`
    Html,
    /// `text/plain`
    Text,
    /// Anything else, including absent MIME information
    Unknown,
}

impl ContentType {
    /// Classify a MIME string, e.g. from a `Content-Type` header.
    pub fn from_mime(mime: Option<&str>) -> Self {
        let Some(mime) = mime else {
            return ContentType::Unknown;
        };
        let mime = mime.to_lowercase();

        if mime.contains("application/x-www-form-urlencoded") {
            ContentType::UrlEncoded
        } else if mime.contains("application/json") {
            ContentType::Json
        } else if mime.contains("text/xml") || mime.contains("application/xml") {
            ContentType::Xml
        } else if mime.contains("text/html") {
            ContentType::Html
        } else if mime.contains("text/plain") {
            ContentType::Text
        } else {
            ContentType::Unknown
        }
    }

    /// Header value used when this tag is set on an outgoing request.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::UrlEncoded => "application/x-www-form-urlencoded",
            ContentType::Json => "application/json",
            ContentType::Xml => "text/xml",
            ContentType::Html => "text/html",
            ContentType::Text => "text/plain",
            ContentType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
