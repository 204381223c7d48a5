//! In-memory storage backends.
//!
//! Clones share the same underlying map, so a store handed to several
//! components (or kept by a test) observes every write.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::RwLock;

use super::{KeyValueStore, SecureStore, SecurityLevel, StorageError};

/// Process-local secret storage.
#[derive(Clone, Default)]
pub struct MemorySecureStore {
    secrets: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl MemorySecureStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, StorageError> {
        Ok(self.secrets.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Option<&SecretString>) -> Result<(), StorageError> {
        let mut secrets = self.secrets.write().await;
        match value {
            Some(value) => {
                secrets.insert(key.to_string(), value.clone());
            }
            None => {
                secrets.remove(key);
            }
        }
        Ok(())
    }

    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::Ephemeral
    }
}

/// Process-local key-value storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn test_secure_store_set_and_delete() {
        let store = MemorySecureStore::new();
        store
            .set("accessToken", Some(&SecretString::from("abc")))
            .await
            .unwrap();
        assert_eq!(
            store.get("accessToken").await.unwrap().unwrap().expose_secret(),
            "abc"
        );

        store.set("accessToken", None).await.unwrap();
        assert!(store.get("accessToken").await.unwrap().is_none());
        assert_eq!(store.security_level(), SecurityLevel::Ephemeral);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("@cart", "{}").await.unwrap();
        assert_eq!(other.get("@cart").await.unwrap().as_deref(), Some("{}"));

        other.remove("@cart").await.unwrap();
        other.remove("@cart").await.unwrap();
        assert!(store.get("@cart").await.unwrap().is_none());
    }
}
