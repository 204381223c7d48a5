//! The shopping cart aggregate.
//!
//! A [`Cart`] owns its line items and the four derived aggregates
//! (`total`, `discounted_total`, `total_products`, `total_quantity`). The
//! aggregates are private and only ever written by the recompute step that
//! runs at the end of every mutation, so they cannot drift from the lines.
//!
//! Discounts are applied per line: the cart's discounted total is the sum of
//! the lines' discounted totals, never the cart total scaled by an averaged
//! discount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartId, ProductId, UserId};
use super::price::apply_discount;
use super::product::Product;

/// Errors raised by cart mutations.
///
/// Both variants indicate that the caller's view of the cart is out of sync
/// with the cart itself; they are not user-facing conditions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No cart has been loaded or created yet.
    #[error("cart not found")]
    CartNotFound,
    /// The cart has no line item for the product.
    #[error("product {0} not found in cart")]
    LineNotFound(ProductId),
}

// =============================================================================
// Line Items
// =============================================================================

/// The product fields a cart line is created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartLine {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub discount_percentage: Decimal,
    pub thumbnail: String,
}

impl From<&Product> for NewCartLine {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            discount_percentage: product.discount_percentage,
            thumbnail: product.thumbnail.clone(),
        }
    }
}

/// A line item: one product and its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: ProductId,
    pub title: String,
    /// Unit price before discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Always at least 1 while the line is in a cart.
    pub quantity: u32,
    /// `price × quantity`.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    /// `total × (1 − discount_percentage / 100)`.
    #[serde(with = "rust_decimal::serde::float")]
    pub discounted_total: Decimal,
    pub thumbnail: String,
}

impl CartProduct {
    fn new(line: NewCartLine, quantity: u32) -> Self {
        let mut product = Self {
            id: line.id,
            title: line.title,
            price: line.price,
            quantity,
            total: Decimal::ZERO,
            discount_percentage: line.discount_percentage,
            discounted_total: Decimal::ZERO,
            thumbnail: line.thumbnail,
        };
        product.set_quantity(quantity);
        product
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.total = self.price * Decimal::from(quantity);
        self.discounted_total = apply_discount(self.total, self.discount_percentage);
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A user's shopping cart.
///
/// Serializes to the same JSON shape the catalog API uses for carts.
/// Deserialization goes through [`CartSnapshot`] and re-derives every total,
/// so a stored cart with stale or hand-edited aggregates is repaired on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CartSnapshot")]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    products: Vec<CartProduct>,
    #[serde(with = "rust_decimal::serde::float")]
    total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    discounted_total: Decimal,
    total_products: u32,
    total_quantity: u32,
}

/// Raw stored form of a [`Cart`], before normalization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    id: CartId,
    user_id: UserId,
    #[serde(default)]
    products: Vec<CartProduct>,
}

impl From<CartSnapshot> for Cart {
    fn from(snapshot: CartSnapshot) -> Self {
        let mut cart = Self::empty(snapshot.id, snapshot.user_id);
        for mut line in snapshot.products {
            if line.quantity == 0 || cart.position(line.id).is_some() {
                continue;
            }
            line.set_quantity(line.quantity);
            cart.products.push(line);
        }
        cart.recompute_totals();
        cart
    }
}

impl Cart {
    /// Create an empty cart for a user.
    #[must_use]
    pub const fn empty(id: CartId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            products: Vec::new(),
            total: Decimal::ZERO,
            discounted_total: Decimal::ZERO,
            total_products: 0,
            total_quantity: 0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> CartId {
        self.id
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn products(&self) -> &[CartProduct] {
        &self.products
    }

    /// Sum of line totals.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Sum of line discounted totals.
    #[must_use]
    pub const fn discounted_total(&self) -> Decimal {
        self.discounted_total
    }

    /// Number of distinct line items.
    #[must_use]
    pub const fn total_products(&self) -> u32 {
        self.total_products
    }

    /// Sum of line quantities.
    #[must_use]
    pub const fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Look up the line item for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartProduct> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Add one unit of a product.
    ///
    /// If the product already has a line, its quantity goes up by one and
    /// the line's price and discount are refreshed from `line` so the line
    /// totals always match the catalog data the caller just saw. Otherwise a
    /// new line with quantity 1 is appended.
    pub fn add(&mut self, line: NewCartLine) {
        if let Some(existing) = self.products.iter_mut().find(|p| p.id == line.id) {
            existing.price = line.price;
            existing.discount_percentage = line.discount_percentage;
            existing.set_quantity(existing.quantity.saturating_add(1));
        } else {
            self.products.push(CartProduct::new(line, 1));
        }
        self.recompute_totals();
    }

    /// Increase a line's quantity by one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart.
    pub fn increment(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let line = self
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.set_quantity(line.quantity.saturating_add(1));
        self.recompute_totals();
        Ok(())
    }

    /// Decrease a line's quantity by one, removing the line at zero.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart.
    pub fn decrement(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let index = self
            .position(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;

        let remaining = self
            .products
            .get(index)
            .map_or(0, |line| line.quantity.saturating_sub(1));

        if remaining == 0 {
            self.products.remove(index);
        } else if let Some(line) = self.products.get_mut(index) {
            line.set_quantity(remaining);
        }
        self.recompute_totals();
        Ok(())
    }

    /// Remove a product's line. Does nothing if the product is absent.
    pub fn remove(&mut self, product_id: ProductId) {
        self.products.retain(|p| p.id != product_id);
        self.recompute_totals();
    }

    /// Remove every line, keeping the cart's identity and owner.
    pub fn clear(&mut self) {
        self.products.clear();
        self.recompute_totals();
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.products.iter().position(|p| p.id == product_id)
    }

    fn recompute_totals(&mut self) {
        self.total = self.products.iter().map(|p| p.total).sum();
        self.discounted_total = self.products.iter().map(|p| p.discounted_total).sum();
        self.total_products = u32::try_from(self.products.len()).unwrap_or(u32::MAX);
        self.total_quantity = self
            .products
            .iter()
            .fold(0_u32, |acc, p| acc.saturating_add(p.quantity));
    }
}
