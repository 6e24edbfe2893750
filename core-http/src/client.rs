//! # Request Executor
//!
//! Drives every outbound network call: resolves the request URL against the
//! session base, gates on reachability, runs the retry state machine against
//! the transport, and delivers exactly one terminal outcome per logical call
//! chain through a serialized callback context.
//!
//! ## Overview
//!
//! [`HttpClient`] is an explicitly constructed service object; the host's
//! composition root owns its lifecycle and injects the transport and probe
//! collaborators. There is no shared global instance.
//!
//! Retry policy is deliberately narrow: only transport timeouts are
//! transient, and the number of wire attempts never exceeds one plus the
//! effective retry budget. The relative path is appended to the base URL once
//! per chain; retries reuse the resolved URL.
//!
//! ## Callback ordering
//!
//! Success/error callbacks and the registered global response observers all
//! run on one serialized dispatcher context, observers strictly after the
//! caller's own callback for the same envelope. Pre-flight failures (bad URL,
//! no internet) invoke the error callback synchronously from `request` and
//! skip the observers, since no wire attempt was made.

use bridge_traits::http::{
    HttpTransport, SessionConfig, TransportError, TransportReply, WireRequest,
};
use bridge_traits::network::ProbeFactory;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{HttpError, Result};
use crate::handle::{RequestHandle, RequestState};
use crate::reachability::ReachabilityMonitor;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::types::ContentType;

/// Hosts probed by default to detect a working network path.
const DEFAULT_PROBE_HOSTS: [&str; 2] = ["google.com", "apple.com"];

/// Delay before refreshing the network-activity flag after an attempt
/// returns, so the outstanding-request count has settled.
const ACTIVITY_REFRESH_DELAY: Duration = Duration::from_millis(100);

type ObserverFn = Arc<dyn Fn(&HttpResponse) + Send + Sync>;
type ObserverRegistry = Arc<Mutex<HashMap<String, ObserverFn>>>;
type Outcome = std::result::Result<HttpResponse, HttpResponse>;

#[derive(Default)]
struct SessionState {
    base_url: Option<Url>,
    retry: u32,
}

/// Serialized execution context for user-visible callbacks.
///
/// Jobs run one at a time on a single consumer task, so callback bodies never
/// run concurrently with each other.
#[derive(Clone)]
struct CallbackDispatcher {
    jobs: mpsc::UnboundedSender<Box<dyn FnOnce() + Send>>,
}

impl CallbackDispatcher {
    fn new() -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Box<dyn FnOnce() + Send>>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { jobs }
    }

    fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.jobs.send(Box::new(job));
    }
}

/// Http client for network requests
///
/// # Example
///
/// ```ignore
/// use bridge_desktop::{ReqwestTransport, TcpProbeFactory};
/// use core_http::{HttpClient, HttpRequest};
/// use std::sync::Arc;
/// use url::Url;
///
/// # async fn example() {
/// let client = HttpClient::new(
///     Arc::new(ReqwestTransport::new()),
///     Arc::new(TcpProbeFactory::new()),
/// )
/// .await;
/// client.set_base_url(Some(Url::parse("https://api.example.com").unwrap())).await;
///
/// match client.send(None, HttpRequest::get("v1/profile"), None).await {
///     Ok(response) => println!("{}", response.status),
///     Err(response) => eprintln!("failed: {}", response.status),
/// }
/// # }
/// ```
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    reachability: Arc<ReachabilityMonitor>,
    session: Mutex<SessionState>,
    observers: ObserverRegistry,
    dispatcher: CallbackDispatcher,
    activity_tx: watch::Sender<bool>,
    activity_rx: watch::Receiver<bool>,
}

impl HttpClient {
    /// Create a client and start reachability monitoring against the default
    /// probe hosts.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn new(transport: Arc<dyn HttpTransport>, probes: Arc<dyn ProbeFactory>) -> Self {
        let client =
            Self::with_reachability(transport, Arc::new(ReachabilityMonitor::new(probes)));
        let hosts = default_probe_hosts();
        if let Err(e) = client.reachability.start(&hosts).await {
            warn!(error = %e, "Default reachability monitoring failed to start");
        }
        client
    }

    /// Create a client over an existing monitor without starting monitoring.
    ///
    /// Intended for composition roots and tests that manage the monitor's
    /// lifecycle themselves. Must be called within a Tokio runtime.
    pub fn with_reachability(
        transport: Arc<dyn HttpTransport>,
        reachability: Arc<ReachabilityMonitor>,
    ) -> Self {
        let (activity_tx, activity_rx) = watch::channel(false);
        Self {
            transport,
            reachability,
            session: Mutex::new(SessionState::default()),
            observers: Arc::new(Mutex::new(HashMap::new())),
            dispatcher: CallbackDispatcher::new(),
            activity_tx,
            activity_rx,
        }
    }

    /// The reachability monitor this client gates requests on.
    pub fn reachability(&self) -> Arc<ReachabilityMonitor> {
        self.reachability.clone()
    }

    /// Session-wide base URL used when a call doesn't pass its own.
    pub fn base_url(&self) -> Option<Url> {
        self.session
            .lock()
            .expect("session state lock poisoned")
            .base_url
            .clone()
    }

    /// Set the session-wide base URL.
    ///
    /// Also restarts reachability monitoring: the old host set is dropped and
    /// monitoring begins fresh with the default probe hosts plus the new base
    /// URL's host.
    pub async fn set_base_url(&self, base_url: Option<Url>) {
        {
            let mut session = self.session.lock().expect("session state lock poisoned");
            session.base_url = base_url.clone();
        }

        self.reachability.stop();
        let mut hosts = default_probe_hosts();
        if let Some(host) = base_url.as_ref().and_then(|url| url.host_str()) {
            hosts.push(host.to_string());
        }
        match self.reachability.start(&hosts).await {
            Ok(()) => info!(hosts = hosts.join(", "), "Reachability monitoring restarted"),
            Err(e) => warn!(error = %e, "Reachability monitoring failed to restart"),
        }
    }

    /// Session-wide retry budget applied when a call doesn't pass its own.
    /// Defaults to 0: no retries unless configured.
    pub fn default_retry(&self) -> u32 {
        self.session
            .lock()
            .expect("session state lock poisoned")
            .retry
    }

    /// Set the session-wide retry budget.
    pub fn set_default_retry(&self, retry: u32) {
        self.session
            .lock()
            .expect("session state lock poisoned")
            .retry = retry;
    }

    /// Replace the shared connection-pool configuration.
    ///
    /// The pool is torn down and rebuilt; requests already in flight finish
    /// on the old pool. Use [`SessionConfig::additional_headers`] for
    /// session-wide headers such as authentication.
    pub fn set_session_config(&self, config: &SessionConfig) -> Result<()> {
        self.transport
            .reconfigure(config)
            .map_err(|e| HttpError::Configuration(e.to_string()))
    }

    /// Register a named observer invoked with every completed response
    /// envelope, regardless of which call site issued the request.
    /// Registering the same name again replaces the observer.
    pub fn add_response_observer(
        &self,
        name: impl Into<String>,
        observer: impl Fn(&HttpResponse) + Send + Sync + 'static,
    ) {
        self.observers
            .lock()
            .expect("observer registry lock poisoned")
            .insert(name.into(), Arc::new(observer));
    }

    /// Remove the response observer registered under `name`.
    pub fn remove_response_observer(&self, name: &str) {
        self.observers
            .lock()
            .expect("observer registry lock poisoned")
            .remove(name);
    }

    /// Watch whether any request is currently on the wire, for driving a
    /// network-activity indicator. Updated on a short delay after every
    /// attempt; cosmetic only.
    pub fn activity(&self) -> watch::Receiver<bool> {
        self.activity_rx.clone()
    }

    /// Issue a request, delivering exactly one terminal callback.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for this call; falls back to the session base URL.
    /// * `request` - The request descriptor.
    /// * `retry` - Retry budget for this call; falls back to the session budget.
    /// * `success` - Invoked with the envelope when the response validates.
    /// * `error` - Invoked with the envelope on any terminal failure.
    ///
    /// # Returns
    ///
    /// A [`RequestHandle`] that can cancel the chain. Cancelling before the
    /// terminal callback suppresses all callbacks, retries included. When no
    /// usable URL can be formed or no monitored host is reachable, `error` is
    /// invoked synchronously with a synthetic envelope and the returned
    /// handle is already terminal.
    pub fn request<S, E>(
        &self,
        base_url: Option<Url>,
        request: HttpRequest,
        retry: Option<u32>,
        success: S,
        error: E,
    ) -> RequestHandle
    where
        S: FnOnce(HttpResponse) + Send + 'static,
        E: FnOnce(HttpResponse) + Send + 'static,
    {
        let (session_base, session_retry) = {
            let session = self.session.lock().expect("session state lock poisoned");
            (session.base_url.clone(), session.retry)
        };
        let base = base_url.or(session_base);

        let url = match resolve_request_url(base.as_ref(), &request) {
            Some(url) => url,
            None => {
                warn!(path = request.path(), "Request URL could not be built");
                error(HttpResponse::invalid_url(base));
                return RequestHandle::terminal(RequestState::Failed);
            }
        };

        if self.reachability.is_monitoring() && !self.reachability.is_internet_available() {
            warn!(url = %url, "No monitored host is reachable, request not attempted");
            error(HttpResponse::no_internet(url));
            return RequestHandle::terminal(RequestState::Failed);
        }

        let wire = build_wire_request(&url, &request);
        let retry_budget = retry.unwrap_or(session_retry);

        let (handle, publisher) = RequestHandle::new();
        let transport = self.transport.clone();
        let dispatcher = self.dispatcher.clone();
        let observers = self.observers.clone();
        let activity = self.activity_tx.clone();
        let mut descriptor = request;

        tokio::spawn(async move {
            let terminal = loop {
                let attempt = descriptor.retries_count();
                publisher.set(if attempt == 0 {
                    RequestState::InFlight
                } else {
                    RequestState::Retrying(attempt)
                });

                activity.send_replace(true);
                let reply = transport.send(wire.clone()).await;
                schedule_activity_refresh(transport.clone(), activity.clone());

                // Checked after completion, before any retry is dispatched
                if publisher.cancel_requested() {
                    break None;
                }

                let timed_out = reply
                    .error
                    .as_ref()
                    .is_some_and(TransportError::is_timeout);
                if timed_out && attempt < retry_budget {
                    descriptor = descriptor.next_retry();
                    debug!(
                        url = %url,
                        retry = descriptor.retries_count(),
                        "Retrying request after timeout"
                    );
                    continue;
                }

                let outcome = conclude(&url, &descriptor, reply);

                // Checked again right before terminal dispatch
                if publisher.cancel_requested() {
                    break None;
                }

                break Some(outcome);
            };

            match terminal {
                None => {
                    debug!(url = %url, "Request chain cancelled");
                    publisher.set(RequestState::Cancelled);
                }
                Some(Ok(envelope)) => {
                    publisher.set(RequestState::Succeeded);
                    dispatcher.dispatch(move || {
                        let shared = envelope.clone();
                        success(envelope);
                        notify_observers(&observers, &shared);
                    });
                }
                Some(Err(envelope)) => {
                    publisher.set(RequestState::Failed);
                    dispatcher.dispatch(move || {
                        let shared = envelope.clone();
                        error(envelope);
                        notify_observers(&observers, &shared);
                    });
                }
            }
        });

        handle
    }

    /// Issue a request and await its terminal envelope.
    ///
    /// `Ok` carries the envelope of a validated response, `Err` the envelope
    /// of any terminal failure, mirroring the success/error callback split.
    pub async fn send(
        &self,
        base_url: Option<Url>,
        request: HttpRequest,
        retry: Option<u32>,
    ) -> Outcome {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let slot = Arc::new(Mutex::new(Some(tx)));

        let on_success = {
            let slot = slot.clone();
            move |response| deliver(&slot, Ok(response))
        };
        let on_error = {
            let slot = slot.clone();
            move |response| deliver(&slot, Err(response))
        };

        let _handle = self.request(base_url, request, retry, on_success, on_error);

        match rx.await {
            Ok(outcome) => outcome,
            // The chain ended without a callback (cancelled elsewhere)
            Err(_) => Err(HttpResponse::unknown_status(None, None)),
        }
    }
}

fn default_probe_hosts() -> Vec<String> {
    DEFAULT_PROBE_HOSTS.iter().map(|s| s.to_string()).collect()
}

fn deliver(slot: &Arc<Mutex<Option<oneshot::Sender<Outcome>>>>, outcome: Outcome) {
    if let Ok(mut guard) = slot.lock() {
        if let Some(tx) = guard.take() {
            let _ = tx.send(outcome);
        }
    }
}

/// Resolve the effective absolute URL for a descriptor.
///
/// The relative path is appended only on the first attempt of a chain
/// (`retries_count == 0`); a descriptor that has already been retried reuses
/// the resolved URL it is invoked with.
fn resolve_request_url(base: Option<&Url>, request: &HttpRequest) -> Option<Url> {
    let base = base?;
    if request.retries_count() == 0 && !request.path().is_empty() {
        base.join(request.path()).ok()
    } else {
        Some(base.clone())
    }
}

fn build_wire_request(url: &Url, request: &HttpRequest) -> WireRequest {
    let mut wire = WireRequest::new(request.method(), url.as_str());
    if let Some(content_type) = request.content_type {
        wire = wire.header("Content-Type", content_type.as_str());
    }
    for (name, value) in &request.headers {
        wire = wire.header(name.clone(), value.clone());
    }
    if let Some(body) = &request.body {
        wire = wire.body(body.clone());
    }
    wire
}

/// Validate a transport reply and build the terminal envelope.
///
/// Success requires a response with status in [200, 399], no transport error,
/// and a matching content type when the descriptor expects one. Failures keep
/// whatever partial data exists so the caller can inspect it.
fn conclude(url: &Url, request: &HttpRequest, reply: TransportReply) -> Outcome {
    let TransportReply {
        response,
        body,
        error,
    } = reply;

    let valid = match &response {
        Some(metadata) => {
            let status_ok = (200..=399).contains(&i32::from(metadata.status));
            let content_ok = match request.expected_response_content_type {
                Some(expected) => {
                    let mime = metadata
                        .headers
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                        .map(|(_, value)| value.as_str());
                    ContentType::from_mime(mime) == expected
                }
                None => true,
            };
            status_ok && content_ok
        }
        None => false,
    };

    match response {
        Some(metadata) if valid && error.is_none() => {
            Ok(HttpResponse::from_wire(metadata, body, None))
        }
        Some(metadata) => Err(HttpResponse::from_wire(metadata, body, error)),
        None => Err(HttpResponse::unknown_status(Some(url.clone()), error)),
    }
}

fn notify_observers(observers: &ObserverRegistry, envelope: &HttpResponse) {
    let snapshot: Vec<ObserverFn> = observers
        .lock()
        .expect("observer registry lock poisoned")
        .values()
        .cloned()
        .collect();
    for observer in snapshot {
        observer(envelope);
    }
}

fn schedule_activity_refresh(transport: Arc<dyn HttpTransport>, activity: watch::Sender<bool>) {
    tokio::spawn(async move {
        tokio::time::sleep(ACTIVITY_REFRESH_DELAY).await;
        activity.send_replace(transport.outstanding_requests() > 0);
    });
}
