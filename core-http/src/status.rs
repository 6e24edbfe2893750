//! HTTP status code modeling.
//!
//! Includes synthetic negative codes for local failure classes so every
//! terminal envelope carries a status, whether or not a server was reached.

use std::fmt;

/// HTTP status code enum.
///
/// More info <https://en.wikipedia.org/wiki/List_of_HTTP_status_codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HttpStatusCode {
    Continue = 100,
    SwitchingProtocols = 101,

    Ok = 200,
    Created = 201,
    Accepted = 202,
    NonAuthoritativeInformation = 203,
    NoContent = 204,
    ResetContent = 205,
    PartialContent = 206,

    MultipleChoices = 300,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    UseProxy = 305,
    TemporaryRedirect = 307,

    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthenticationRequired = 407,
    RequestTimeout = 408,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFailed = 412,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    RangeNotSatisfiable = 416,
    ExpectationFailed = 417,

    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,

    /// The request URL could not be built; no network attempt was made.
    InvalidUrl = -1001,
    /// The response could not be parsed into a known status.
    CouldNotParseResponse = -1002,
    /// No monitored host is currently reachable; no network attempt was made.
    NoInternet = -1003,
    /// Completion without a usable response (e.g. transport-level failure).
    UnknownStatus = 0,
}

impl HttpStatusCode {
    /// Map a wire status code, falling back to `UnknownStatus` for anything
    /// outside the known set.
    pub fn from_code(code: i32) -> Self {
        use HttpStatusCode::*;
        match code {
            100 => Continue,
            101 => SwitchingProtocols,
            200 => Ok,
            201 => Created,
            202 => Accepted,
            203 => NonAuthoritativeInformation,
            204 => NoContent,
            205 => ResetContent,
            206 => PartialContent,
            300 => MultipleChoices,
            301 => MovedPermanently,
            302 => Found,
            303 => SeeOther,
            304 => NotModified,
            305 => UseProxy,
            307 => TemporaryRedirect,
            400 => BadRequest,
            401 => Unauthorized,
            402 => PaymentRequired,
            403 => Forbidden,
            404 => NotFound,
            405 => MethodNotAllowed,
            406 => NotAcceptable,
            407 => ProxyAuthenticationRequired,
            408 => RequestTimeout,
            409 => Conflict,
            410 => Gone,
            411 => LengthRequired,
            412 => PreconditionFailed,
            413 => PayloadTooLarge,
            414 => UriTooLong,
            415 => UnsupportedMediaType,
            416 => RangeNotSatisfiable,
            417 => ExpectationFailed,
            500 => InternalServerError,
            501 => NotImplemented,
            502 => BadGateway,
            503 => ServiceUnavailable,
            504 => GatewayTimeout,
            505 => HttpVersionNotSupported,
            -1001 => InvalidUrl,
            -1002 => CouldNotParseResponse,
            -1003 => NoInternet,
            _ => UnknownStatus,
        }
    }

    /// Numeric code, negative for synthetic local-failure classes.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Whether this code falls in the range a request is considered
    /// successful for, [200, 399].
    pub fn is_success_range(&self) -> bool {
        (200..=399).contains(&self.code())
    }

    /// Whether this is one of the synthetic codes produced without reaching
    /// a server.
    pub fn is_synthetic(&self) -> bool {
        self.code() <= 0
    }

    /// Short description of the status.
    pub fn status_description(&self) -> &'static str {
        use HttpStatusCode::*;
        match self {
            Continue => "Continue",
            SwitchingProtocols => "Switching protocols",
            Ok => "OK",
            Created => "Created",
            Accepted => "Accepted",
            NonAuthoritativeInformation => "Non-authoritative information",
            NoContent => "No content",
            ResetContent => "Reset content",
            PartialContent => "Partial content",
            MultipleChoices => "Multiple choices",
            MovedPermanently => "Moved permanently",
            Found => "Found",
            SeeOther => "See other",
            NotModified => "Not modified",
            UseProxy => "Use proxy",
            TemporaryRedirect => "Temporary redirect",
            BadRequest => "Bad request",
            Unauthorized => "Unauthorized",
            PaymentRequired => "Payment required",
            Forbidden => "Forbidden",
            NotFound => "Resource not found",
            MethodNotAllowed => "Method not allowed",
            NotAcceptable => "Not acceptable",
            ProxyAuthenticationRequired => "Proxy authentication required",
            RequestTimeout => "Request timeout",
            Conflict => "Conflict",
            Gone => "Gone",
            LengthRequired => "Length required",
            PreconditionFailed => "Precondition failed",
            PayloadTooLarge => "Payload too large",
            UriTooLong => "Request URI too long",
            UnsupportedMediaType => "Unsupported media type",
            RangeNotSatisfiable => "Requested range not satisfiable",
            ExpectationFailed => "Expectation failed",
            InternalServerError => "Internal server error",
            NotImplemented => "Not implemented",
            BadGateway => "Bad gateway",
            ServiceUnavailable => "Service unavailable",
            GatewayTimeout => "Gateway timeout",
            HttpVersionNotSupported => "HTTP version not supported",
            InvalidUrl => "Invalid URL",
            CouldNotParseResponse => "Could not parse response",
            NoInternet => "No internet connection to hosts",
            UnknownStatus => "Unknown status code",
        }
    }
}

impl fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.status_description())
    }
}
