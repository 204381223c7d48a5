//! Cart and favorites snapshots.

use std::sync::Arc;

use tote_core::{Cart, Favorites};
use tracing::error;

use super::KeyValueStore;

/// Key-value key holding the JSON-encoded cart.
pub const CART_KEY: &str = "@cart";
/// Key-value key holding the JSON-encoded favorites array.
pub const FAVORITES_KEY: &str = "@favorites";

/// Full-snapshot persistence for the cart and favorites aggregates.
///
/// Loads never fail: unreadable or corrupt data is logged and replaced by the
/// empty default. Saves are best effort and only log on failure.
pub struct LocalPersistence<K> {
    store: Arc<K>,
}

impl<K> Clone for LocalPersistence<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K: KeyValueStore> LocalPersistence<K> {
    #[must_use]
    pub fn new(store: K) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Load the stored cart, if any.
    pub async fn load_cart(&self) -> Option<Cart> {
        let raw = self.read(CART_KEY).await?;
        serde_json::from_str(&raw)
            .inspect_err(|e| error!(error = %e, "Stored cart is corrupt, ignoring it"))
            .ok()
    }

    /// Store the cart, or delete the stored cart when `cart` is `None`.
    pub async fn save_cart(&self, cart: Option<&Cart>) {
        match cart {
            Some(cart) => self.write_json(CART_KEY, cart).await,
            None => self.remove(CART_KEY).await,
        }
    }

    /// Load the stored favorites. Absent or corrupt data yields an empty list.
    pub async fn load_favorites(&self) -> Favorites {
        let Some(raw) = self.read(FAVORITES_KEY).await else {
            return Favorites::default();
        };
        serde_json::from_str(&raw)
            .inspect_err(|e| error!(error = %e, "Stored favorites are corrupt, ignoring them"))
            .unwrap_or_default()
    }

    pub async fn save_favorites(&self, favorites: &Favorites) {
        self.write_json(FAVORITES_KEY, favorites).await;
    }

    pub async fn clear_favorites(&self) {
        self.remove(FAVORITES_KEY).await;
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                error!(key, error = %e, "Failed to read from local storage");
                None
            }
        }
    }

    async fn write_json<T: serde::Serialize + Sync>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!(key, error = %e, "Failed to serialize for local storage");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &json).await {
            error!(key, error = %e, "Failed to write to local storage");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            error!(key, error = %e, "Failed to remove from local storage");
        }
    }
}
