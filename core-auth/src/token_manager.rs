//! # Token Lifecycle Manager
//!
//! Keeps a bearer token valid without the caller's involvement. The manager
//! watches response envelopes for an updated token (typically registered as a
//! global response observer on the executor), persists it through the secure
//! store, and runs a single proactive expiry-check timer so a token about to
//! expire is cleared and reported before a request fails on it.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::TokenManager;
//! use std::sync::Arc;
//!
//! let manager = Arc::new(TokenManager::new(secure_store, "access_token"));
//!
//! manager.on_token_expired(|| {
//!     // prompt the user to sign in again
//! });
//!
//! let observer = manager.clone();
//! client.add_response_observer("token-manager", move |response| {
//!     let manager = observer.clone();
//!     let response = response.clone();
//!     tokio::spawn(async move { manager.configure_token(&response).await });
//! });
//! ```

use bridge_traits::storage::{SecretOptions, SecureStore};
use chrono::Utc;
use core_http::HttpResponse;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::jwt;

/// Response header carrying the bearer token. Envelope header keys are
/// lower-cased.
const TOKEN_HEADER: &str = "authorization";

/// Default period between proactive expiry checks.
pub const DEFAULT_EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

type ConfiguredHandler = Arc<dyn Fn(&str) + Send + Sync>;
type EventHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Handlers {
    configured: Mutex<Option<ConfiguredHandler>>,
    cleared: Mutex<Option<EventHandler>>,
    expired: Mutex<Option<EventHandler>>,
}

/// Bearer-token lifecycle manager.
///
/// At most one expiry-check timer is live at a time; configuring a token
/// replaces the previous timer. Token values are never logged.
pub struct TokenManager {
    secure_store: Arc<dyn SecureStore>,
    persistence_key: String,
    check_interval: Duration,
    handlers: Handlers,
    /// Token in use at the moment, kept to detect no-op updates
    existing_token: tokio::sync::Mutex<Option<String>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl TokenManager {
    /// Create a manager persisting the token under `persistence_key`.
    pub fn new(secure_store: Arc<dyn SecureStore>, persistence_key: impl Into<String>) -> Self {
        Self {
            secure_store,
            persistence_key: persistence_key.into(),
            check_interval: DEFAULT_EXPIRY_CHECK_INTERVAL,
            handlers: Handlers::default(),
            existing_token: tokio::sync::Mutex::new(None),
            timer: Mutex::new(None),
        }
    }

    /// Override the expiry-check period. A token whose remaining lifetime is
    /// at or below this interval is treated as expired. Lower values suit
    /// tests.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Handler invoked whenever a token is configured, with the token value.
    pub fn on_token_configured(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        *self
            .handlers
            .configured
            .lock()
            .expect("handler lock poisoned") = Some(Arc::new(handler));
    }

    /// Handler invoked whenever the token is cleared.
    pub fn on_token_cleared(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.handlers.cleared.lock().expect("handler lock poisoned") =
            Some(Arc::new(handler));
    }

    /// Handler invoked when the expiry check finds the token about to expire.
    pub fn on_token_expired(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.handlers.expired.lock().expect("handler lock poisoned") =
            Some(Arc::new(handler));
    }

    /// Configure the token carried by a response envelope.
    ///
    /// No-op when the envelope has no token header, or when the token equals
    /// the one already in use. Otherwise the token is persisted, the
    /// configured handler runs, and the expiry-check timer is rescheduled.
    pub async fn configure_token(self: &Arc<Self>, response: &HttpResponse) {
        let Some(token) = response.headers.get(TOKEN_HEADER) else {
            return;
        };

        let mut existing = self.existing_token.lock().await;
        if existing.as_deref() == Some(token.as_str()) {
            debug!("Token unchanged, keeping existing configuration");
            return;
        }

        if let Err(e) = self
            .secure_store
            .set_secret(
                &self.persistence_key,
                token.as_bytes(),
                SecretOptions::default(),
            )
            .await
        {
            warn!(error = %e, "Failed to persist access token");
            return;
        }

        self.notify_configured(token);
        self.schedule_expiry_check(token.clone());
        *existing = Some(token.clone());
        info!("Access token configured");
    }

    /// Whether the persisted token is still valid.
    ///
    /// A valid token re-runs the configure side effects (handler, timer,
    /// cache) so a cold-started app resumes its session. An expired token is
    /// cleared by the check itself and `false` is returned.
    pub async fn is_current_token_valid(self: &Arc<Self>) -> bool {
        let token = match self.secure_store.get_secret(&self.persistence_key).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(token) => token,
                Err(_) => {
                    warn!("Stored token is not valid UTF-8");
                    return false;
                }
            },
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Secure storage unavailable");
                return false;
            }
        };

        if self.is_token_expired(&token).await {
            return false;
        }

        self.notify_configured(&token);
        self.schedule_expiry_check(token.clone());
        *self.existing_token.lock().await = Some(token);
        true
    }

    /// Clear the token in use: delete the persisted value, cancel the pending
    /// expiry check, and run the cleared handler. Idempotent.
    pub async fn clear_token(&self) {
        match self.secure_store.get_secret(&self.persistence_key).await {
            Ok(Some(_)) => {
                if let Err(e) = self.secure_store.delete_secret(&self.persistence_key).await {
                    warn!(error = %e, "Failed to delete persisted token");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Secure storage unavailable"),
        }

        self.cancel_expiry_check();
        self.notify_cleared();
        info!("Access token cleared");
    }

    /// (Re)schedule the periodic expiry check for `token`, replacing any
    /// previous timer. The first check runs immediately.
    pub fn schedule_expiry_check(self: &Arc<Self>, token: String) {
        let weak = Arc::downgrade(self);
        let interval = self.check_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else { break };
                if manager.is_token_expired(&token).await {
                    // The check already cleared the token and aborted this
                    // task; nothing below may await.
                    warn!("Access token will expire soon");
                    manager.notify_expired();
                    break;
                }
            }
        });

        let mut timer = self.timer.lock().expect("expiry timer lock poisoned");
        if let Some(previous) = timer.replace(task) {
            previous.abort();
        }
    }

    /// Whether `token` is expired, treating "expires within one check
    /// interval" as expired. Clears the token as a side effect when it is.
    /// A token without a decodable expiry claim is not expired.
    async fn is_token_expired(&self, token: &str) -> bool {
        let Ok(payload) = jwt::decode_payload(token) else {
            return false;
        };
        let Some(expiration) = payload.expiration else {
            return false;
        };

        let remaining = expiration.timestamp() - Utc::now().timestamp();
        if remaining <= self.check_interval.as_secs() as i64 {
            self.clear_token().await;
            true
        } else {
            false
        }
    }

    fn cancel_expiry_check(&self) {
        if let Some(timer) = self
            .timer
            .lock()
            .expect("expiry timer lock poisoned")
            .take()
        {
            timer.abort();
        }
    }

    fn notify_configured(&self, token: &str) {
        let handler = self
            .handlers
            .configured
            .lock()
            .expect("handler lock poisoned")
            .clone();
        if let Some(handler) = handler {
            handler(token);
        }
    }

    fn notify_cleared(&self) {
        let handler = self
            .handlers
            .cleared
            .lock()
            .expect("handler lock poisoned")
            .clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    fn notify_expired(&self) {
        let handler = self
            .handlers
            .expired
            .lock()
            .expect("handler lock poisoned")
            .clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        self.cancel_expiry_check();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use core_http::HttpStatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSecureStore {
        storage: tokio::sync::Mutex<HashMap<String, Vec<u8>>>,
        sets: AtomicUsize,
    }

    impl MockSecureStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                storage: tokio::sync::Mutex::new(HashMap::new()),
                sets: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(
            &self,
            key: &str,
            value: &[u8],
            _options: SecretOptions,
        ) -> BridgeResult<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.storage.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.storage.lock().await.remove(key);
            Ok(())
        }
    }

    fn envelope_with_token(token: &str) -> HttpResponse {
        HttpResponse::new(
            None,
            HttpStatusCode::Ok,
            HashMap::from([("authorization".to_string(), token.to_string())]),
        )
    }

    fn test_token(expires_in_secs: i64) -> String {
        let exp = Utc::now().timestamp() + expires_in_secs;
        let payload = jwt::base64url_encode(format!("{{\"exp\":{exp}}}").as_bytes());
        format!("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{payload}.c2lnbmF0dXJl")
    }

    #[tokio::test]
    async fn test_configure_token_persists_and_notifies() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let configured = Arc::new(AtomicUsize::new(0));
        {
            let configured = configured.clone();
            manager.on_token_configured(move |_| {
                configured.fetch_add(1, Ordering::SeqCst);
            });
        }

        let token = test_token(3600);
        manager.configure_token(&envelope_with_token(&token)).await;

        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
        assert_eq!(configured.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.storage.lock().await.get("token-test"),
            Some(&token.into_bytes())
        );
    }

    #[tokio::test]
    async fn test_identical_token_is_a_noop() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let configured = Arc::new(AtomicUsize::new(0));
        {
            let configured = configured.clone();
            manager.on_token_configured(move |_| {
                configured.fetch_add(1, Ordering::SeqCst);
            });
        }

        let token = test_token(3600);
        manager.configure_token(&envelope_with_token(&token)).await;
        manager.configure_token(&envelope_with_token(&token)).await;

        // Exactly one persist/handler cycle for the repeated token
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
        assert_eq!(configured.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_envelope_without_token_is_ignored() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let response = HttpResponse::new(None, HttpStatusCode::Ok, HashMap::new());
        manager.configure_token(&response).await;

        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_changed_token_reconfigures() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        manager
            .configure_token(&envelope_with_token(&test_token(3600)))
            .await;
        manager
            .configure_token(&envelope_with_token(&test_token(7200)))
            .await;

        assert_eq!(store.sets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_token_is_idempotent() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let cleared = Arc::new(AtomicUsize::new(0));
        {
            let cleared = cleared.clone();
            manager.on_token_cleared(move || {
                cleared.fetch_add(1, Ordering::SeqCst);
            });
        }

        manager
            .configure_token(&envelope_with_token(&test_token(3600)))
            .await;
        manager.clear_token().await;
        manager.clear_token().await;

        assert!(store.storage.lock().await.is_empty());
        assert_eq!(cleared.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_valid_token_reconfigures_from_storage() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let token = test_token(3600);
        store
            .set_secret("token-test", token.as_bytes(), SecretOptions::default())
            .await
            .unwrap();

        let configured = Arc::new(AtomicUsize::new(0));
        {
            let configured = configured.clone();
            manager.on_token_configured(move |_| {
                configured.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(manager.is_current_token_valid().await);
        assert_eq!(configured.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_token_is_invalid() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store, "token-test"));
        assert!(!manager.is_current_token_valid().await);
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid_and_cleared() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let token = test_token(-10);
        store
            .set_secret("token-test", token.as_bytes(), SecretOptions::default())
            .await
            .unwrap();

        assert!(!manager.is_current_token_valid().await);
        // The expiry check clears the persisted token as a side effect
        assert!(store.storage.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_token_without_expiry_fails_open() {
        let store = MockSecureStore::new();
        let manager = Arc::new(TokenManager::new(store.clone(), "token-test"));

        let payload = jwt::base64url_encode(b"{\"sub\":\"user\"}");
        let token = format!("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{payload}.c2ln");
        store
            .set_secret("token-test", token.as_bytes(), SecretOptions::default())
            .await
            .unwrap();

        assert!(manager.is_current_token_valid().await);
    }
}
