//! Reachability monitoring.
//!
//! Tracks, per configured host, whether a working network path exists and
//! aggregates the per-host reports into a single availability flag: the
//! internet counts as available while at least one monitored host is
//! reachable. Probing itself is delegated to the host platform through
//! [`ReachabilityProbe`].

use bridge_traits::network::{ProbeFactory, ReachabilityProbe};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{HttpError, Result};

type SubscriberFn = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct MonitorInner {
    probes: Vec<Arc<dyn ReachabilityProbe>>,
    hosts: Vec<String>,
    watchers: Vec<JoinHandle<()>>,
    subscribers: HashMap<String, SubscriberFn>,
}

/// Monitors whether any working network connection to the configured hosts
/// exists.
///
/// Lifecycle: `start` validates every host string up front (all-or-nothing)
/// and is idempotent-additive, adding hosts to an already running monitor.
/// `stop` tears everything down, including the subscriber registry, and is
/// safe to call even if monitoring never started.
pub struct ReachabilityMonitor {
    factory: Arc<dyn ProbeFactory>,
    inner: Mutex<MonitorInner>,
    available: AtomicBool,
}

impl ReachabilityMonitor {
    pub fn new(factory: Arc<dyn ProbeFactory>) -> Self {
        Self {
            factory,
            inner: Mutex::new(MonitorInner::default()),
            available: AtomicBool::new(false),
        }
    }

    /// Start reachability monitoring for `hosts`.
    ///
    /// Host strings may be bare hostnames or full URLs; if any of them is
    /// malformed, no monitoring begins. A host whose prober cannot be
    /// constructed is skipped with a warning while the rest proceed.
    ///
    /// Probes take a moment to report their first status; the availability
    /// flag starts out optimistically `true` to avoid false negatives during
    /// that warm-up.
    pub async fn start(self: &Arc<Self>, hosts: &[String]) -> Result<()> {
        let mut normalized = Vec::with_capacity(hosts.len());
        for host in hosts {
            let parsed = normalize_host(host)
                .ok_or_else(|| HttpError::InvalidHost(host.clone()))?;
            normalized.push(parsed);
        }

        let mut started = Vec::new();
        for host in normalized {
            let probe = match self.factory.probe(&host) {
                Ok(probe) => probe,
                Err(e) => {
                    warn!(host = host.as_str(), error = %e, "Skipping host, prober construction failed");
                    continue;
                }
            };
            let stream = match probe.subscribe().await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(host = host.as_str(), error = %e, "Skipping host, probe subscription failed");
                    continue;
                }
            };
            started.push((host, probe, stream));
        }

        {
            let mut inner = self.inner.lock().expect("reachability state lock poisoned");
            for (host, probe, mut stream) in started {
                let weak = Arc::downgrade(self);
                let watcher = tokio::spawn(async move {
                    while stream.next().await.is_some() {
                        let Some(monitor) = weak.upgrade() else { break };
                        monitor.refresh().await;
                    }
                });
                inner.probes.push(probe);
                inner.hosts.push(host);
                inner.watchers.push(watcher);
            }

            info!(
                hosts = inner.hosts.join(", "),
                "Started reachability monitoring"
            );
        }

        self.available.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop reachability monitoring and clear all state, subscriber registry
    /// included.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().expect("reachability state lock poisoned");
        for watcher in inner.watchers.drain(..) {
            watcher.abort();
        }
        inner.probes.clear();
        inner.hosts.clear();
        inner.subscribers.clear();
        drop(inner);

        self.available.store(false, Ordering::SeqCst);
        info!("Stopped reachability monitoring");
    }

    /// Whether any monitored host is currently considered reachable.
    pub fn is_internet_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Whether any hosts are being monitored at the moment.
    pub fn is_monitoring(&self) -> bool {
        !self
            .inner
            .lock()
            .expect("reachability state lock poisoned")
            .hosts
            .is_empty()
    }

    /// Hosts being monitored at the moment.
    pub fn monitoring_hosts(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("reachability state lock poisoned")
            .hosts
            .clone()
    }

    /// Register a named availability subscriber. Registering the same name
    /// again replaces the previous subscriber.
    pub fn add_subscriber(
        &self,
        name: impl Into<String>,
        subscriber: impl Fn(bool) + Send + Sync + 'static,
    ) {
        self.inner
            .lock()
            .expect("reachability state lock poisoned")
            .subscribers
            .insert(name.into(), Arc::new(subscriber));
    }

    /// Remove the subscriber registered under `name`.
    pub fn remove_subscriber(&self, name: &str) {
        self.inner
            .lock()
            .expect("reachability state lock poisoned")
            .subscribers
            .remove(name);
    }

    /// Recompute the aggregate flag from current per-host status and notify
    /// subscribers.
    async fn refresh(&self) {
        let probes: Vec<Arc<dyn ReachabilityProbe>> = {
            self.inner
                .lock()
                .expect("reachability state lock poisoned")
                .probes
                .clone()
        };

        let mut available = false;
        for probe in &probes {
            if probe.is_reachable().await {
                available = true;
                break;
            }
        }
        self.available.store(available, Ordering::SeqCst);
        debug!(available = available, "Reachability status updated");

        let subscribers: Vec<SubscriberFn> = {
            self.inner
                .lock()
                .expect("reachability state lock poisoned")
                .subscribers
                .values()
                .cloned()
                .collect()
        };
        for subscriber in subscribers {
            subscriber(available);
        }
    }
}

/// Extract a bare hostname from a host string that may be a hostname or a
/// full URL. Returns `None` for malformed input.
fn normalize_host(host: &str) -> Option<String> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("://") {
        Url::parse(trimmed)
            .ok()?
            .host_str()
            .map(str::to_string)
    } else {
        url::Host::parse(trimmed).ok().map(|h| h.to_string())
    }
}
