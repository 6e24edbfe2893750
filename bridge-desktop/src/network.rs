//! TCP-based Reachability Probes
//!
//! Probes a host by opening a TCP connection to port 443 under a short
//! timeout. Change notification is poll-based; platform-native network-change
//! APIs (netlink, SystemConfiguration, Network List Manager) would be more
//! responsive but need per-OS dependencies.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{ProbeFactory, ReachabilityProbe, ReachabilityStream},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PROBE_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reachability probe for a single host
pub struct TcpProbe {
    host: String,
    poll_interval: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            host: host.into(),
            poll_interval,
        }
    }

    async fn check(host: &str) -> bool {
        let reachable = matches!(
            tokio::time::timeout(
                CONNECT_TIMEOUT,
                tokio::net::TcpStream::connect((host, PROBE_PORT)),
            )
            .await,
            Ok(Ok(_))
        );
        debug!(host = host, reachable = reachable, "Probe check");
        reachable
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    fn host(&self) -> &str {
        &self.host
    }

    async fn is_reachable(&self) -> bool {
        Self::check(&self.host).await
    }

    async fn subscribe(&self) -> Result<Box<dyn ReachabilityStream>> {
        Ok(Box::new(TcpProbeStream {
            host: self.host.clone(),
            poll_interval: self.poll_interval,
            last: None,
        }))
    }
}

/// Poll-until-changed stream for a TCP probe
struct TcpProbeStream {
    host: String,
    poll_interval: Duration,
    last: Option<bool>,
}

#[async_trait]
impl ReachabilityStream for TcpProbeStream {
    async fn next(&mut self) -> Option<bool> {
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let reachable = TcpProbe::check(&self.host).await;
            if self.last != Some(reachable) {
                self.last = Some(reachable);
                return Some(reachable);
            }
        }
    }
}

/// Factory producing [`TcpProbe`] instances for validated hosts
pub struct TcpProbeFactory {
    poll_interval: Duration,
}

impl TcpProbeFactory {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for TcpProbeFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeFactory for TcpProbeFactory {
    fn probe(&self, host: &str) -> Result<Arc<dyn ReachabilityProbe>> {
        Ok(Arc::new(TcpProbe::new(host, self.poll_interval)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_builds_probe_for_host() {
        let factory = TcpProbeFactory::new();
        let probe = factory.probe("example.com").unwrap();
        assert_eq!(probe.host(), "example.com");
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_unreachable() {
        let probe = TcpProbe::new("host.invalid", Duration::from_millis(10));
        assert!(!probe.is_reachable().await);
    }
}
