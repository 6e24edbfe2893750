//! Timer-driven token lifecycle tests.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{
    HttpTransport, SessionConfig, TransportReply, WireRequest, WireResponse,
};
use bridge_traits::storage::{SecretOptions, SecureStore};
use bytes::Bytes;
use chrono::Utc;
use core_auth::{jwt, TokenManager};
use core_http::{HttpClient, HttpRequest, ReachabilityMonitor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

struct MockSecureStore {
    storage: tokio::sync::Mutex<HashMap<String, Vec<u8>>>,
}

impl MockSecureStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            storage: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    async fn contains(&self, key: &str) -> bool {
        self.storage.lock().await.contains_key(key)
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

fn test_token(expires_in_secs: i64) -> String {
    let exp = Utc::now().timestamp() + expires_in_secs;
    let payload = jwt::base64url_encode(format!("{{\"exp\":{exp}}}").as_bytes());
    format!("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{payload}.c2lnbmF0dXJl")
}

#[tokio::test]
async fn expiry_handler_fires_within_one_check_cycle() {
    let store = MockSecureStore::new();
    let manager = Arc::new(
        TokenManager::new(store.clone(), "lifecycle-test")
            .with_check_interval(Duration::from_secs(3)),
    );

    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();
    manager.on_token_expired(move || {
        let _ = expired_tx.send(());
    });

    // Expires two seconds from now, inside the three-second check interval
    let token = test_token(2);
    store
        .set_secret("lifecycle-test", token.as_bytes(), SecretOptions::default())
        .await
        .unwrap();
    manager.schedule_expiry_check(token);

    tokio::time::timeout(Duration::from_secs(5), expired_rx.recv())
        .await
        .expect("expiry handler should fire within one check cycle")
        .expect("handler channel open");

    // Clearing is a side effect of the check itself
    assert!(!store.contains("lifecycle-test").await);
}

#[tokio::test]
async fn fresh_token_does_not_trigger_expiry() {
    let store = MockSecureStore::new();
    let manager = Arc::new(
        TokenManager::new(store.clone(), "lifecycle-test")
            .with_check_interval(Duration::from_secs(1)),
    );

    let expired = Arc::new(AtomicUsize::new(0));
    {
        let expired = expired.clone();
        manager.on_token_expired(move || {
            expired.fetch_add(1, Ordering::SeqCst);
        });
    }

    let token = test_token(3600);
    store
        .set_secret("lifecycle-test", token.as_bytes(), SecretOptions::default())
        .await
        .unwrap();
    manager.schedule_expiry_check(token);

    // The immediate first check has long since run by now
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(expired.load(Ordering::SeqCst), 0);
    assert!(store.contains("lifecycle-test").await);
}

#[tokio::test]
async fn configure_then_expire_runs_the_full_cycle() {
    let store = MockSecureStore::new();
    let manager = Arc::new(
        TokenManager::new(store.clone(), "lifecycle-test")
            .with_check_interval(Duration::from_secs(3)),
    );

    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();
    manager.on_token_expired(move || {
        let _ = expired_tx.send(());
    });
    let cleared = Arc::new(AtomicUsize::new(0));
    {
        let cleared = cleared.clone();
        manager.on_token_cleared(move || {
            cleared.fetch_add(1, Ordering::SeqCst);
        });
    }

    let envelope = core_http::HttpResponse::new(
        None,
        core_http::HttpStatusCode::Ok,
        HashMap::from([("authorization".to_string(), test_token(2))]),
    );
    manager.configure_token(&envelope).await;

    tokio::time::timeout(Duration::from_secs(5), expired_rx.recv())
        .await
        .expect("expiry handler should fire")
        .expect("handler channel open");

    assert!(!store.contains("lifecycle-test").await);
    assert_eq!(cleared.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Executor wiring: the manager observes every completed envelope
// ---------------------------------------------------------------------------

struct TokenReplyTransport {
    token: String,
}

#[async_trait]
impl HttpTransport for TokenReplyTransport {
    async fn send(&self, _request: WireRequest) -> TransportReply {
        TransportReply {
            response: Some(WireResponse {
                url: "https://api.example.com/v1/login".to_string(),
                status: 200,
                headers: HashMap::from([
                    (
                        "Content-Type".to_string(),
                        "application/json".to_string(),
                    ),
                    ("Authorization".to_string(), self.token.clone()),
                ]),
            }),
            body: Some(Bytes::from_static(b"{}")),
            error: None,
        }
    }

    fn outstanding_requests(&self) -> usize {
        0
    }

    fn reconfigure(&self, _config: &SessionConfig) -> BridgeResult<()> {
        Ok(())
    }
}

struct NullProbeFactory;

impl bridge_traits::network::ProbeFactory for NullProbeFactory {
    fn probe(
        &self,
        host: &str,
    ) -> BridgeResult<Arc<dyn bridge_traits::network::ReachabilityProbe>> {
        Err(bridge_traits::error::BridgeError::NotAvailable(format!(
            "no probe for {host}"
        )))
    }
}

#[tokio::test]
async fn observer_registration_captures_tokens_from_responses() {
    let token = test_token(3600);
    let transport = Arc::new(TokenReplyTransport {
        token: token.clone(),
    });
    let client = HttpClient::with_reachability(
        transport,
        Arc::new(ReachabilityMonitor::new(Arc::new(NullProbeFactory))),
    );

    let store = MockSecureStore::new();
    let manager = Arc::new(TokenManager::new(store.clone(), "lifecycle-test"));

    let observer = manager.clone();
    client.add_response_observer("token-manager", move |response| {
        let manager = observer.clone();
        let response = response.clone();
        tokio::spawn(async move { manager.configure_token(&response).await });
    });

    client
        .send(
            Some(Url::parse("https://api.example.com").unwrap()),
            HttpRequest::post("v1/login"),
            None,
        )
        .await
        .unwrap();

    for _ in 0..200 {
        if store.contains("lifecycle-test").await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        store.storage.lock().await.get("lifecycle-test"),
        Some(&token.into_bytes())
    );
}
