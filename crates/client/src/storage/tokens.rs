//! Session token persistence.

use std::sync::Arc;

use secrecy::SecretString;
use tote_core::{LoginResponse, RefreshResponse};
use tracing::error;

use super::{SecureStore, SecurityLevel};

/// Secure storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Secure storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// An access/refresh token pair.
///
/// Tokens are opaque; expiry is discovered from the backend rather than
/// tracked locally.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

impl From<LoginResponse> for TokenPair {
    fn from(response: LoginResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: SecretString::from(response.refresh_token),
        }
    }
}

impl From<RefreshResponse> for TokenPair {
    fn from(response: RefreshResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: SecretString::from(response.refresh_token),
        }
    }
}

/// Typed access to the two session tokens.
///
/// Every operation fails closed: a read error is logged and reported as an
/// absent token, and a write error is logged and otherwise ignored.
pub struct TokenStore<S> {
    store: Arc<S>,
}

impl<S> Clone for TokenStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SecureStore> TokenStore<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Protection offered by the underlying backend.
    #[must_use]
    pub fn security_level(&self) -> SecurityLevel {
        self.store.security_level()
    }

    pub async fn access_token(&self) -> Option<SecretString> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    /// Load the stored pair. Returns `None` unless both tokens are present.
    pub async fn load(&self) -> Option<TokenPair> {
        let access_token = self.access_token().await?;
        let refresh_token = self.refresh_token().await?;
        Some(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Persist both tokens.
    pub async fn save(&self, tokens: &TokenPair) {
        self.write(ACCESS_TOKEN_KEY, Some(&tokens.access_token)).await;
        self.write(REFRESH_TOKEN_KEY, Some(&tokens.refresh_token))
            .await;
    }

    /// Delete both tokens.
    pub async fn clear(&self) {
        self.write(ACCESS_TOKEN_KEY, None).await;
        self.write(REFRESH_TOKEN_KEY, None).await;
    }

    async fn read(&self, key: &str) -> Option<SecretString> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                error!(key, error = %e, "Secure storage is unavailable, treating token as absent");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: Option<&SecretString>) {
        if let Err(e) = self.store.set(key, value).await {
            error!(key, error = %e, "Failed to write to secure storage");
        }
    }
}
