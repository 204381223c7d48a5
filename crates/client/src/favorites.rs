//! The favorites engine.
//!
//! Same ownership model as the cart engine: one async mutex around the
//! in-memory list, a full snapshot persisted after every mutation. The list
//! is loaded from storage on first use.

use std::sync::Arc;

use tokio::sync::Mutex;
use tote_core::{Favorites, Product, ProductId};
use tracing::{debug, instrument};

use crate::storage::{KeyValueStore, LocalPersistence};

/// Owner of the favorites list.
pub struct FavoritesEngine<K> {
    persistence: LocalPersistence<K>,
    favorites: Arc<Mutex<Option<Favorites>>>,
}

impl<K> Clone for FavoritesEngine<K> {
    fn clone(&self) -> Self {
        Self {
            persistence: self.persistence.clone(),
            favorites: Arc::clone(&self.favorites),
        }
    }
}

impl<K: KeyValueStore> FavoritesEngine<K> {
    #[must_use]
    pub fn new(persistence: LocalPersistence<K>) -> Self {
        Self {
            persistence,
            favorites: Arc::new(Mutex::new(None)),
        }
    }

    /// (Re)load the list from storage.
    #[instrument(skip(self))]
    pub async fn load_favorites(&self) -> Favorites {
        let mut slot = self.favorites.lock().await;
        let favorites = self.persistence.load_favorites().await;
        debug!(count = favorites.len(), "Favorites loaded");
        *slot = Some(favorites.clone());
        favorites
    }

    /// Add a product. Adding one that is already a favorite changes nothing.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_favorites(&self, product: Product) -> Favorites {
        let mut slot = self.favorites.lock().await;
        let favorites = self.loaded(&mut slot).await;
        if favorites.add(product) {
            self.persistence.save_favorites(favorites).await;
        }
        favorites.clone()
    }

    /// Remove a product. Removing one that is not a favorite changes nothing.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_favorites(&self, product_id: ProductId) -> Favorites {
        let mut slot = self.favorites.lock().await;
        let favorites = self.loaded(&mut slot).await;
        if favorites.remove(product_id) {
            self.persistence.save_favorites(favorites).await;
        }
        favorites.clone()
    }

    #[instrument(skip(self))]
    pub async fn clear_favorites(&self) -> Favorites {
        let mut slot = self.favorites.lock().await;
        let favorites = slot.insert(Favorites::default());
        self.persistence.clear_favorites().await;
        favorites.clone()
    }

    pub async fn is_favorite(&self, product_id: ProductId) -> bool {
        let mut slot = self.favorites.lock().await;
        self.loaded(&mut slot).await.contains(product_id)
    }

    pub async fn favorites(&self) -> Favorites {
        let mut slot = self.favorites.lock().await;
        self.loaded(&mut slot).await.clone()
    }

    async fn loaded<'a>(&self, slot: &'a mut Option<Favorites>) -> &'a mut Favorites {
        if slot.is_none() {
            *slot = Some(self.persistence.load_favorites().await);
        }
        slot.get_or_insert_with(Favorites::default)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{FAVORITES_KEY, MemoryStore};

    fn product(id: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Product {id}"),
            "price": 12.5,
        }))
        .unwrap()
    }

    fn engine(store: &MemoryStore) -> FavoritesEngine<MemoryStore> {
        FavoritesEngine::new(LocalPersistence::new(store.clone()))
    }

    #[tokio::test]
    async fn test_add_twice_adds_once() {
        let favorites = engine(&MemoryStore::new());
        let before = favorites.favorites().await.len();
        favorites.add_to_favorites(product(1)).await;
        let after = favorites.add_to_favorites(product(1)).await;
        assert_eq!(after.len(), before + 1);
        assert!(favorites.is_favorite(ProductId::new(1)).await);
    }

    #[tokio::test]
    async fn test_remove_twice_is_safe() {
        let favorites = engine(&MemoryStore::new());
        favorites.add_to_favorites(product(1)).await;
        favorites.add_to_favorites(product(2)).await;

        let once = favorites.remove_from_favorites(ProductId::new(1)).await;
        let twice = favorites.remove_from_favorites(ProductId::new(1)).await;
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[tokio::test]
    async fn test_persisted_across_engines() {
        let store = MemoryStore::new();
        let favorites = engine(&store);
        favorites.add_to_favorites(product(3)).await;
        favorites.add_to_favorites(product(4)).await;

        let restarted = engine(&store);
        let loaded = restarted.load_favorites().await;
        let ids: Vec<_> = loaded.products().iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_first_use_loads_storage() {
        let store = MemoryStore::new();
        engine(&store).add_to_favorites(product(1)).await;

        // A fresh engine must not overwrite what is stored when adding.
        let after = engine(&store).add_to_favorites(product(2)).await;
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_removes_stored_list() {
        let store = MemoryStore::new();
        let favorites = engine(&store);
        favorites.add_to_favorites(product(1)).await;

        assert!(favorites.clear_favorites().await.is_empty());
        assert!(store.get(FAVORITES_KEY).await.unwrap().is_none());
        assert!(engine(&store).load_favorites().await.is_empty());
    }
}
