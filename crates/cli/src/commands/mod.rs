//! Subcommand implementations.
//!
//! Each function takes the wired client and prints its result to stdout.

pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod session;

use thiserror::Error;
use tote_client::storage::{FileSecureStore, FileStore};
use tote_client::{ApiError, ShopClient, SignInError};
use tote_core::CartError;

/// The on-disk client every command runs against.
pub type Shop = ShopClient<FileSecureStore, FileStore>;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Not signed in. Run `tote login` first")]
    NotSignedIn,

    #[error(transparent)]
    SignIn(#[from] SignInError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

impl CommandError {
    /// Whether signing in again would fix this error.
    #[must_use]
    pub fn needs_sign_in(&self) -> bool {
        match self {
            Self::NotSignedIn => true,
            Self::Api(e) => e.is_auth_failure(),
            Self::SignIn(_) | Self::Cart(_) => false,
        }
    }
}
