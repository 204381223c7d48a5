//! The cart engine.
//!
//! Holds the authoritative in-memory [`Cart`] and persists a full snapshot
//! after every mutation. Every operation runs read-modify-write-persist under
//! one async mutex, so concurrent callers are applied one after another and
//! each sees the result of the previous one. Persistence is best effort: a
//! failed save is logged and the in-memory mutation stands.

use std::sync::Arc;

use tokio::sync::Mutex;
use tote_core::{Cart, CartError, CartId, NewCartLine, Product, ProductId, UserId};
use tracing::{debug, instrument};

use crate::storage::{KeyValueStore, LocalPersistence};

/// Owner of the shopping cart.
pub struct CartEngine<K> {
    persistence: LocalPersistence<K>,
    cart: Arc<Mutex<Option<Cart>>>,
}

impl<K> Clone for CartEngine<K> {
    fn clone(&self) -> Self {
        Self {
            persistence: self.persistence.clone(),
            cart: Arc::clone(&self.cart),
        }
    }
}

impl<K: KeyValueStore> CartEngine<K> {
    #[must_use]
    pub fn new(persistence: LocalPersistence<K>) -> Self {
        Self {
            persistence,
            cart: Arc::new(Mutex::new(None)),
        }
    }

    /// The cart currently held in memory, if any.
    pub async fn current(&self) -> Option<Cart> {
        self.cart.lock().await.clone()
    }

    /// Load the user's cart.
    ///
    /// A stored cart is used only if it belongs to `user_id`; otherwise a
    /// fresh empty cart is started. The fresh cart is not persisted until it
    /// is first mutated.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn load_cart(&self, user_id: UserId) -> Cart {
        let mut slot = self.cart.lock().await;
        let cart = self.stored_or_empty(user_id).await;
        *slot = Some(cart.clone());
        cart
    }

    /// Add one unit of `product` to the user's cart, creating the cart first
    /// if needed.
    #[instrument(skip(self, product), fields(product_id = %product.id, user_id = %user_id))]
    pub async fn add_to_cart(&self, product: &Product, user_id: UserId) -> Cart {
        let mut slot = self.cart.lock().await;

        let mut cart = match slot.take() {
            Some(cart) if cart.user_id() == user_id => cart,
            _ => self.stored_or_empty(user_id).await,
        };
        cart.add(NewCartLine::from(product));

        self.persistence.save_cart(Some(&cart)).await;
        *slot = Some(cart.clone());
        cart
    }

    /// Add one to a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if no cart is loaded and
    /// `CartError::LineNotFound` if the product is not in the cart.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn increment_quantity(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(|cart| cart.increment(product_id)).await
    }

    /// Take one off a line's quantity, removing the line when it reaches
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if no cart is loaded and
    /// `CartError::LineNotFound` if the product is not in the cart.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrement_quantity(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(|cart| cart.decrement(product_id)).await
    }

    /// Remove a product's line. Removing an absent product is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if no cart is loaded.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product_from_cart(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(|cart| {
            cart.remove(product_id);
            Ok(())
        })
        .await
    }

    /// Empty the cart, keeping its identity. Returns `None` if no cart is
    /// loaded.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Option<Cart> {
        self.mutate(|cart| {
            cart.clear();
            Ok(())
        })
        .await
        .ok()
    }

    async fn mutate<F>(&self, op: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartError> + Send,
    {
        let mut slot = self.cart.lock().await;
        let cart = slot.as_mut().ok_or(CartError::CartNotFound)?;
        op(cart)?;

        let snapshot = cart.clone();
        self.persistence.save_cart(Some(&snapshot)).await;
        Ok(snapshot)
    }

    async fn stored_or_empty(&self, user_id: UserId) -> Cart {
        match self.persistence.load_cart().await {
            Some(stored) if stored.user_id() == user_id => stored,
            Some(_) => {
                debug!("Stored cart belongs to another user, starting a new one");
                Cart::empty(new_cart_id(), user_id)
            }
            None => Cart::empty(new_cart_id(), user_id),
        }
    }
}

fn new_cart_id() -> CartId {
    CartId::new(chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStore;

    fn product(id: i64, price: i64, discount: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Product {id}"),
            "price": price,
            "discountPercentage": discount,
            "thumbnail": format!("https://cdn.example.com/{id}.png"),
        }))
        .unwrap()
    }

    fn engine(store: &MemoryStore) -> CartEngine<MemoryStore> {
        CartEngine::new(LocalPersistence::new(store.clone()))
    }

    #[tokio::test]
    async fn test_add_decrement_example() {
        let store = MemoryStore::new();
        let cart = engine(&store);
        let user = UserId::new(7);
        let lamp = product(1, 100, 10);

        let c = cart.add_to_cart(&lamp, user).await;
        assert_eq!(c.line(lamp.id).unwrap().quantity, 1);
        assert_eq!((c.total(), c.discounted_total()), (Decimal::from(100), Decimal::from(90)));

        let c = cart.add_to_cart(&lamp, user).await;
        assert_eq!(c.line(lamp.id).unwrap().quantity, 2);
        assert_eq!((c.total(), c.discounted_total()), (Decimal::from(200), Decimal::from(180)));

        let c = cart.decrement_quantity(lamp.id).await.unwrap();
        assert_eq!((c.total(), c.discounted_total()), (Decimal::from(100), Decimal::from(90)));

        let c = cart.decrement_quantity(lamp.id).await.unwrap();
        assert!(c.line(lamp.id).is_none());
        assert_eq!(c.total_products(), 0);
        assert_eq!(c.total_quantity(), 0);
        assert_eq!(c.total(), Decimal::ZERO);
        assert_eq!(c.discounted_total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_every_mutation_is_persisted() {
        let store = MemoryStore::new();
        let cart = engine(&store);
        let user = UserId::new(7);

        cart.add_to_cart(&product(1, 10, 0), user).await;
        cart.add_to_cart(&product(2, 20, 0), user).await;
        cart.increment_quantity(ProductId::new(2)).await.unwrap();
        cart.remove_product_from_cart(ProductId::new(1)).await.unwrap();

        // A second engine over the same storage plays the part of a restart.
        let restarted = engine(&store);
        let loaded = restarted.load_cart(user).await;
        assert_eq!(loaded, cart.current().await.unwrap());
        assert_eq!(loaded.total_quantity(), 2);
        assert_eq!(loaded.total(), Decimal::from(40));
    }

    #[tokio::test]
    async fn test_load_cart_for_other_user_starts_fresh() {
        let store = MemoryStore::new();
        let cart = engine(&store);
        cart.add_to_cart(&product(1, 10, 0), UserId::new(7)).await;

        let other = engine(&store).load_cart(UserId::new(8)).await;
        assert!(other.is_empty());
        assert_eq!(other.user_id(), UserId::new(8));

        // The fresh cart is not written until it is mutated.
        let again = engine(&store).load_cart(UserId::new(7)).await;
        assert_eq!(again.total_quantity(), 1);
    }

    #[tokio::test]
    async fn test_add_uses_stored_cart_before_load() {
        let store = MemoryStore::new();
        engine(&store).add_to_cart(&product(1, 10, 0), UserId::new(7)).await;

        let cart = engine(&store).add_to_cart(&product(1, 10, 0), UserId::new(7)).await;
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_mutations_without_cart_fail() {
        let cart = engine(&MemoryStore::new());
        assert_eq!(
            cart.increment_quantity(ProductId::new(1)).await.unwrap_err(),
            CartError::CartNotFound
        );
        assert_eq!(
            cart.remove_product_from_cart(ProductId::new(1)).await.unwrap_err(),
            CartError::CartNotFound
        );
        assert!(cart.clear_cart().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_line_is_a_logic_error() {
        let cart = engine(&MemoryStore::new());
        cart.load_cart(UserId::new(1)).await;
        assert_eq!(
            cart.decrement_quantity(ProductId::new(5)).await.unwrap_err(),
            CartError::LineNotFound(ProductId::new(5))
        );
        assert!(cart.remove_product_from_cart(ProductId::new(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_keeps_identity() {
        let store = MemoryStore::new();
        let cart = engine(&store);
        let before = cart.add_to_cart(&product(1, 10, 50), UserId::new(3)).await;

        let cleared = cart.clear_cart().await.unwrap();
        assert_eq!(cleared.id(), before.id());
        assert!(cleared.is_empty());
        assert_eq!(cleared.total(), Decimal::ZERO);
        assert!(engine(&store).load_cart(UserId::new(3)).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let cart = engine(&MemoryStore::new());
        cart.add_to_cart(&product(1, 5, 0), UserId::new(1)).await;

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let cart = cart.clone();
                tokio::spawn(async move { cart.increment_quantity(ProductId::new(1)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let c = cart.current().await.unwrap();
        assert_eq!(c.line(ProductId::new(1)).unwrap().quantity, 21);
        assert_eq!(c.total(), Decimal::from(105));
    }
}
