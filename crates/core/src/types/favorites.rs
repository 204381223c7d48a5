//! The favorites list.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// A list of favorite products with set semantics keyed by product id.
///
/// Adding a product that is already present and removing one that is absent
/// are both no-ops. Insertion order is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Product>", into = "Vec<Product>")]
pub struct Favorites {
    products: Vec<Product>,
}

impl From<Vec<Product>> for Favorites {
    fn from(products: Vec<Product>) -> Self {
        let mut favorites = Self::default();
        for product in products {
            favorites.add(product);
        }
        favorites
    }
}

impl From<Favorites> for Vec<Product> {
    fn from(favorites: Favorites) -> Self {
        favorites.products
    }
}

impl Favorites {
    /// Add a product. Returns `false` if it was already a favorite.
    pub fn add(&mut self, product: Product) -> bool {
        if self.contains(product.id) {
            return false;
        }
        self.products.push(product);
        true
    }

    /// Remove a product. Returns `false` if it was not a favorite.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != product_id);
        self.products.len() != before
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.iter().any(|p| p.id == product_id)
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
