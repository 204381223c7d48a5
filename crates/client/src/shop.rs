//! Wiring for a complete shopping client.

use tote_core::UserId;

use crate::api::{ApiClient, AuthenticatedClient, CatalogClient};
use crate::cart::CartEngine;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::favorites::FavoritesEngine;
use crate::session::{SessionManager, SessionStore};
use crate::storage::{
    FileSecureStore, FileStore, KeyValueStore, LocalPersistence, SecureStore, TokenStore,
};

/// Every engine of the shopping client, wired to shared storage and a
/// shared session.
///
/// Handles are cheap to clone and can be passed to whichever part of the
/// application needs them.
pub struct ShopClient<S, K> {
    session: SessionManager<S>,
    catalog: CatalogClient<S>,
    http: AuthenticatedClient<S>,
    cart: CartEngine<K>,
    favorites: FavoritesEngine<K>,
}

impl<S, K> Clone for ShopClient<S, K> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            catalog: self.catalog.clone(),
            http: self.http.clone(),
            cart: self.cart.clone(),
            favorites: self.favorites.clone(),
        }
    }
}

impl ShopClient<FileSecureStore, FileStore> {
    /// Build a client that keeps everything under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be created.
    pub fn on_disk(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(
            config,
            FileSecureStore::new(&config.data_dir),
            FileStore::new(&config.data_dir),
        )
    }
}

impl<S: SecureStore + 'static, K: KeyValueStore> ShopClient<S, K> {
    /// Build a client over the given storage backends.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig, secure_store: S, store: K) -> Result<Self, ApiError> {
        let api = ApiClient::new(config)?;
        let session = SessionStore::new(TokenStore::new(secure_store));
        let http = AuthenticatedClient::new(
            api.clone(),
            session.clone(),
            config.refresh_expires_in_mins,
        );
        let persistence = LocalPersistence::new(store);

        Ok(Self {
            session: SessionManager::new(session, api, http.clone(), config.refresh_expires_in_mins),
            catalog: CatalogClient::new(http.clone(), config.catalog_cache_ttl),
            http,
            cart: CartEngine::new(persistence.clone()),
            favorites: FavoritesEngine::new(persistence),
        })
    }

    #[must_use]
    pub const fn session(&self) -> &SessionManager<S> {
        &self.session
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogClient<S> {
        &self.catalog
    }

    /// Authenticated access to any other endpoint.
    #[must_use]
    pub const fn http(&self) -> &AuthenticatedClient<S> {
        &self.http
    }

    #[must_use]
    pub const fn cart(&self) -> &CartEngine<K> {
        &self.cart
    }

    #[must_use]
    pub const fn favorites(&self) -> &FavoritesEngine<K> {
        &self.favorites
    }

    /// The signed-in user's id, once the profile is loaded.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.session.state().user().map(|user| user.id)
    }
}
