//! Cancellation handle for in-flight requests.
//!
//! A [`RequestHandle`] is returned to the caller for every issued request.
//! It exposes the chain's explicit state machine and a structured cancel
//! signal; a chain cancelled before its terminal callback delivers no
//! callbacks at all, including across retries.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one logical call chain, retries included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Accepted, not yet on the wire
    Pending,
    /// First attempt in flight
    InFlight,
    /// Retry attempt `n` in flight
    Retrying(u32),
    /// Terminal: success callback delivered
    Succeeded,
    /// Terminal: error callback delivered (or pre-flight failure)
    Failed,
    /// Terminal: cancelled; no callback was or will be delivered
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Failed | RequestState::Cancelled
        )
    }
}

/// Capability object for observing and severing one request chain.
///
/// `state()` is authoritative for the chain's outcome; `is_cancelled()`
/// reports whether cancellation was requested, which distinguishes an
/// explicitly cancelled chain from one that completed normally.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    cancel: CancellationToken,
    state: watch::Receiver<RequestState>,
}

impl RequestHandle {
    pub(crate) fn new() -> (Self, RequestStatePublisher) {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(RequestState::Pending);
        let handle = Self {
            cancel: cancel.clone(),
            state: rx,
        };
        (handle, RequestStatePublisher { tx, cancel })
    }

    /// Handle for a request that terminated before any work was spawned
    /// (pre-flight validation failures).
    pub(crate) fn terminal(state: RequestState) -> Self {
        let cancel = CancellationToken::new();
        if state == RequestState::Cancelled {
            cancel.cancel();
        }
        let (tx, rx) = watch::channel(state);
        // Receiver keeps the last value after the sender drops
        drop(tx);
        Self { cancel, state: rx }
    }

    /// Request cancellation of the chain.
    ///
    /// Takes effect at the chain's next cancellation check; it is not
    /// preemptive mid-flight. Cancelling an already terminal chain is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested on this handle.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || *self.state.borrow() == RequestState::Cancelled
    }

    /// Current state of the chain.
    pub fn state(&self) -> RequestState {
        *self.state.borrow()
    }

    /// Wait until the chain reaches a terminal state and return it.
    pub async fn done(&mut self) -> RequestState {
        loop {
            let state = *self.state.borrow();
            if state.is_terminal() {
                return state;
            }
            if self.state.changed().await.is_err() {
                return *self.state.borrow();
            }
        }
    }
}

/// Executor-side writer for a handle's state.
pub(crate) struct RequestStatePublisher {
    tx: watch::Sender<RequestState>,
    cancel: CancellationToken,
}

impl RequestStatePublisher {
    pub(crate) fn set(&self, state: RequestState) {
        let _ = self.tx.send(state);
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
