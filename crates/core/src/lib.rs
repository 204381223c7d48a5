//! Tote Core - Shared types library.
//!
//! This crate provides the domain types used across all Tote components:
//! - `client` - Session, storage, HTTP and cart/favorites engines
//! - `cli` - Command-line shopping client
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no storage
//! access, no HTTP clients. Cart arithmetic and listing filters live here so
//! they can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, products, carts, favorites and user profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
