//! Core types for Tote.
//!
//! This module provides type-safe wrappers for catalog, cart, favorites and
//! account concepts.

pub mod cart;
pub mod credentials;
pub mod favorites;
pub mod id;
pub mod listing;
pub mod price;
pub mod product;
pub mod user;

pub use cart::{Cart, CartError, CartProduct, CartSnapshot, NewCartLine};
pub use credentials::{Credentials, CredentialsError};
pub use favorites::Favorites;
pub use id::*;
pub use listing::{ListingQuery, PriceRange, SortOption, UnknownSortOption};
pub use price::{apply_discount, discount_factor, format_usd};
pub use product::{
    format_category_name, CategorySummary, Dimensions, Meta, Product, ProductsPage, Review,
};
pub use user::{Address, Company, Coordinates, LoginResponse, RefreshResponse, User};
