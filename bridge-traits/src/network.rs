//! Reachability Probing Abstraction
//!
//! Per-host primitives for detecting whether a working network path exists.
//! The core's reachability monitor owns one probe per configured host and
//! aggregates their reports; this crate only defines the per-host contract.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// A single-host reachability probe.
///
/// # Platform Support
///
/// - **Desktop**: TCP connect checks or OS network-change APIs
/// - **iOS**: Network framework / SCNetworkReachability
/// - **Android**: ConnectivityManager
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// The host this probe watches.
    fn host(&self) -> &str;

    /// Current reachability of the host.
    async fn is_reachable(&self) -> bool;

    /// Subscribe to reachability changes for this host.
    ///
    /// The stream yields the new reachable flag on every flip. Implementations
    /// should emit only on change, not on every poll.
    async fn subscribe(&self) -> Result<Box<dyn ReachabilityStream>>;
}

/// Stream of per-host reachability flips.
#[async_trait]
pub trait ReachabilityStream: Send {
    /// Next reachability change, or `None` when the probe shuts down.
    async fn next(&mut self) -> Option<bool>;
}

/// Constructs probes for validated host strings.
///
/// Construction may fail for an individual host (e.g. resolver limits); the
/// monitor decides how to handle partial failure.
pub trait ProbeFactory: Send + Sync {
    fn probe(&self, host: &str) -> Result<Arc<dyn ReachabilityProbe>>;
}
