//! Database encryption-key management.
//!
//! Local persistence layers that encrypt at rest need a stable key that
//! never leaves secure storage. [`DatabaseKeyStore`] generates the key on
//! first use and hands back the same bytes on every later call.

use bridge_traits::storage::{SecretOptions, SecureStore};
use rand::RngCore;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AuthError, Result};

/// Length of the generated database encryption key in bytes.
pub const DATABASE_KEY_LENGTH: usize = 64;

/// Generates and persists a database encryption key via the secure store.
pub struct DatabaseKeyStore {
    secure_store: Arc<dyn SecureStore>,
    key_identifier: String,
}

impl DatabaseKeyStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, key_identifier: impl Into<String>) -> Self {
        Self {
            secure_store,
            key_identifier: key_identifier.into(),
        }
    }

    /// Fetch the encryption key, generating and persisting one on first use.
    ///
    /// A stored key of unexpected length is treated as corrupted and
    /// replaced.
    pub async fn encryption_key(&self) -> Result<Vec<u8>> {
        let existing = self
            .secure_store
            .get_secret(&self.key_identifier)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        if let Some(key) = existing {
            if key.len() == DATABASE_KEY_LENGTH {
                return Ok(key);
            }
            warn!(
                key_id = self.key_identifier.as_str(),
                "Stored database key has unexpected length, regenerating"
            );
        }

        self.store_fresh_key().await
    }

    /// Replace the persisted key with a newly generated one.
    pub async fn rotate_key(&self) -> Result<Vec<u8>> {
        self.store_fresh_key().await
    }

    /// Delete the persisted key. Idempotent.
    pub async fn delete_key(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key_identifier)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }

    async fn store_fresh_key(&self) -> Result<Vec<u8>> {
        let mut key = vec![0u8; DATABASE_KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);

        self.secure_store
            .set_secret(&self.key_identifier, &key, SecretOptions::default())
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        info!(
            key_id = self.key_identifier.as_str(),
            "Generated new database encryption key"
        );
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MockSecureStore {
        storage: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MockSecureStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                storage: Mutex::new(HashMap::new()),
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

    #[tokio::test]
    async fn test_key_is_generated_once_and_stable() {
        let store = MockSecureStore::new();
        let keys = DatabaseKeyStore::new(store, "db-key");

        let first = keys.encryption_key().await.unwrap();
        let second = keys.encryption_key().await.unwrap();

        assert_eq!(first.len(), DATABASE_KEY_LENGTH);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rotate_replaces_key() {
        let store = MockSecureStore::new();
        let keys = DatabaseKeyStore::new(store, "db-key");

        let original = keys.encryption_key().await.unwrap();
        let rotated = keys.rotate_key().await.unwrap();

        assert_ne!(original, rotated);
        assert_eq!(keys.encryption_key().await.unwrap(), rotated);
    }

    #[tokio::test]
    async fn test_corrupt_key_is_replaced() {
        let store = MockSecureStore::new();
        store
            .set_secret("db-key", b"short", SecretOptions::default())
            .await
            .unwrap();
        let keys = DatabaseKeyStore::new(store, "db-key");

        let key = keys.encryption_key().await.unwrap();
        assert_eq!(key.len(), DATABASE_KEY_LENGTH);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MockSecureStore::new();
        let keys = DatabaseKeyStore::new(store, "db-key");

        keys.encryption_key().await.unwrap();
        keys.delete_key().await.unwrap();
        keys.delete_key().await.unwrap();
    }
}
