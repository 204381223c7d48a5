//! On-device storage.
//!
//! Two storage facilities back the client:
//!
//! - [`SecureStore`] holds the session's access and refresh tokens.
//! - [`KeyValueStore`] holds JSON snapshots of the cart and favorites.
//!
//! Backends report failures as [`StorageError`]. The typed layers built on
//! top of them, [`TokenStore`] and [`LocalPersistence`], log every failure and
//! fall back to a safe default, so engine code never sees a storage error.

pub mod file;
pub mod memory;
mod persistence;
mod tokens;

use secrecy::SecretString;
use thiserror::Error;

pub use file::{FileSecureStore, FileStore};
pub use memory::{MemorySecureStore, MemoryStore};
pub use persistence::{CART_KEY, FAVORITES_KEY, LocalPersistence};
pub use tokens::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenPair, TokenStore};

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The platform credential facility refused the operation.
    #[error("Secure storage unavailable: {0}")]
    Unavailable(String),
}

/// How strongly a [`SecureStore`] protects the secrets it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// OS credential facility (keychain, keystore, secret service).
    Platform,
    /// Plain file readable only by the current user. Weaker than
    /// [`SecurityLevel::Platform`]: anything running as the user can read it.
    Fallback,
    /// Process memory only. Nothing survives a restart.
    Ephemeral,
}

/// Secret key-value storage for session tokens.
///
/// Implementations wrap whatever credential facility the platform offers.
pub trait SecureStore: Send + Sync {
    /// Read a secret. `Ok(None)` means the key is absent.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<SecretString>, StorageError>> + Send;

    /// Write a secret, or delete it when `value` is `None`.
    fn set(
        &self,
        key: &str,
        value: Option<&SecretString>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Protection offered by this backend.
    fn security_level(&self) -> SecurityLevel;
}

/// General-purpose string storage for app state snapshots.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete a value. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}
