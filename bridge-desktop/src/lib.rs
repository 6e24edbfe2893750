//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - [`ReqwestTransport`] - `HttpTransport` backed by a reqwest connection pool
//! - [`KeyringSecureStore`] - `SecureStore` backed by the OS keychain
//! - [`TcpProbeFactory`] / [`TcpProbe`] - TCP-connect based reachability probes
//!
//! ## Feature Flags
//!
//! - `secure-store`: enable OS keychain integration (default)

mod http;
mod network;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestTransport;
pub use network::{TcpProbe, TcpProbeFactory};

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
