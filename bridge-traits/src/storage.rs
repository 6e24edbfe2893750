//! Secure Credential Storage Abstraction
//!
//! Abstracts platform secure storage mechanisms:
//! - macOS/iOS: Keychain
//! - Android: Keystore (hardware-backed when available)
//! - Windows: DPAPI
//! - Linux: Secret Service / libsecret
//!
//! Implementations MUST encrypt data at rest, use platform-provided secure
//! storage when available, and never log or expose stored values.

use async_trait::async_trait;

use crate::error::Result;

/// Per-secret storage options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretOptions {
    /// Whether the secret may synchronize across the user's devices
    /// (e.g. iCloud Keychain). Defaults to `false`; bearer tokens and
    /// database keys stay device-local.
    pub synchronizable: bool,
}

/// Secure credential storage trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{SecretOptions, SecureStore};
///
/// async fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store
///         .set_secret("access_token", token.as_bytes(), SecretOptions::default())
///         .await
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, overwriting any previous value for `key`.
    async fn set_secret(&self, key: &str, value: &[u8], options: SecretOptions) -> Result<()>;

    /// Retrieve a secret value.
    ///
    /// Returns `Ok(None)` if the key doesn't exist. Returned data should be
    /// handled securely and never logged.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it.
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
