//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the HTTP client core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that is provided differently per platform (desktop, iOS,
//! Android):
//!
//! - [`HttpTransport`](http::HttpTransport) - connection pool that issues one
//!   wire request and reports completion as `(body?, response?, error?)`
//! - [`SecureStore`](storage::SecureStore) - credential persistence
//!   (Keychain/Keystore/Credential Manager)
//! - [`ReachabilityProbe`](network::ReachabilityProbe) - per-host network-path
//!   probing with change notifications
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so they can be shared across
//! async tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod network;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{
    HttpMethod, HttpTransport, SessionConfig, TransportError, TransportReply, WireRequest,
    WireResponse,
};
pub use network::{ProbeFactory, ReachabilityProbe, ReachabilityStream};
pub use storage::{SecretOptions, SecureStore};
