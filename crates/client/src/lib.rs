//! Tote Client - session, storage and HTTP layers of the shopping client.
//!
//! # Architecture
//!
//! - [`storage`] - Secure token storage and cart/favorites snapshots
//! - [`api`] - Base HTTP client, re-authenticating client and catalog
//! - [`session`] - Session state machine and lifecycle operations
//! - [`cart`] / [`favorites`] - Engines owning the two user aggregates
//! - [`ShopClient`] - Wires all of the above together
//!
//! All shared state is reached through handles passed in explicitly; there
//! are no process-wide singletons.
//!
//! # Security
//!
//! Tokens are held as `secrecy::SecretString` and never logged. Storage
//! failures fail closed: an unreadable token counts as signed out.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod favorites;
pub mod session;
mod shop;
pub mod storage;

pub use api::{ApiClient, ApiRequest, AuthenticatedClient, CatalogClient, Page};
pub use cart::CartEngine;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use favorites::FavoritesEngine;
pub use session::{SessionManager, SessionPhase, SessionState, SessionStore, SignInError};
pub use shop::ShopClient;
