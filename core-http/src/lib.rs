//! # HTTP Client Core
//!
//! Request/retry/reachability orchestration for the HTTP client SDK.
//!
//! ## Overview
//!
//! This crate decides, for every outbound network call, whether to attempt
//! it, how to recover from transient failure, and how to report the outcome:
//!
//! - [`HttpRequest`] - descriptor of one logical HTTP call
//! - [`HttpClient`] - request executor over an injected [`HttpTransport`](bridge_traits::http::HttpTransport)
//! - [`HttpResponse`] - normalized envelope handed to callbacks and observers
//! - [`RequestHandle`] - per-chain state machine and cancellation capability
//! - [`ReachabilityMonitor`] - host-level network-path availability
//! - [`JsonCoder`] - typed JSON coding with a pluggable date format
//!
//! ## Features
//!
//! - Timeout-only retry with a per-call or session-wide budget
//! - Reachability-gated requests with synthetic no-internet envelopes
//! - Structured cancellation covering every retry of a chain
//! - Serialized callback delivery plus named global response observers
//! - At-most-once JSON deserialization cached on the envelope

pub mod client;
pub mod codec;
pub mod error;
pub mod handle;
pub mod logging;
pub mod reachability;
pub mod request;
pub mod response;
pub mod status;
pub mod types;

pub use bridge_traits::http::{HttpMethod, SessionConfig};
pub use client::HttpClient;
pub use codec::{ApiError, ApiResult, CodecError, JsonCoder};
pub use error::{HttpError, Result};
pub use handle::{RequestHandle, RequestState};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use reachability::ReachabilityMonitor;
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use status::HttpStatusCode;
pub use types::ContentType;
