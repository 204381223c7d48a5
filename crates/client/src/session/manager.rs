//! Session lifecycle: restore, sign-in, profile fetch and sign-out.

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;
use tote_core::{Credentials, CredentialsError, User};
use tracing::{debug, error, info, instrument, warn};

use super::{SessionPhase, SessionState, SessionStore};
use crate::api::{ApiClient, AuthenticatedClient, auth};
use crate::error::ApiError;
use crate::storage::{SecureStore, SecurityLevel, TokenPair};

/// Reasons a sign-in attempt can fail.
#[derive(Debug, Error)]
pub enum SignInError {
    /// Rejected locally before any network call.
    #[error(transparent)]
    Validation(#[from] CredentialsError),

    /// The backend refused the credentials or could not be reached.
    #[error("Sign in failed: {0}")]
    Rejected(#[from] ApiError),
}

/// Drives the authentication lifecycle.
///
/// The manager holds no state of its own; everything lives in the shared
/// [`SessionStore`], so clones are interchangeable.
pub struct SessionManager<S> {
    session: SessionStore<S>,
    api: ApiClient,
    http: AuthenticatedClient<S>,
    refresh_expires_in_mins: u32,
}

impl<S> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            api: self.api.clone(),
            http: self.http.clone(),
            refresh_expires_in_mins: self.refresh_expires_in_mins,
        }
    }
}

impl<S: SecureStore + 'static> SessionManager<S> {
    #[must_use]
    pub const fn new(
        session: SessionStore<S>,
        api: ApiClient,
        http: AuthenticatedClient<S>,
        refresh_expires_in_mins: u32,
    ) -> Self {
        Self {
            session,
            api,
            http,
            refresh_expires_in_mins,
        }
    }

    /// Restore the session from secure storage.
    ///
    /// With both tokens stored, they are refreshed right away. If that
    /// refresh fails the stored pair is used as is and left to the 401 path
    /// to sort out. The profile is then fetched. Without stored tokens the
    /// session settles as unauthenticated.
    ///
    /// Only the first call does anything; later calls return the current
    /// phase. A sign-in or sign-out while the refresh is pending wins over
    /// the restored tokens.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionPhase {
        if self.session.snapshot().phase() != SessionPhase::Initializing {
            return self.phase();
        }
        let epoch = self.session.epoch();

        let Some(stored) = self.session.tokens().load().await else {
            debug!("No stored session");
            self.session.mark_loaded();
            return self.phase();
        };

        self.session.begin_restore();

        let applied = match auth::refresh(
            &self.api,
            &stored.refresh_token,
            self.refresh_expires_in_mins,
        )
        .await
        {
            Ok(response) => {
                debug!("Stored session refreshed");
                self.session
                    .store_tokens(epoch, TokenPair::from(response))
                    .await
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh token on session restore, keeping stored tokens");
                self.session.set_tokens(epoch, stored)
            }
        };

        if !applied {
            debug!("Session changed during restore, discarding stored tokens");
            return self.phase();
        }

        self.ensure_profile().await;
        self.phase()
    }

    /// Sign in with a username and password.
    ///
    /// On success the tokens are persisted and the profile is fetched before
    /// returning. On failure the session is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SignInError::Validation` for an empty username or password
    /// (no request is made) and `SignInError::Rejected` if the backend
    /// refuses the credentials.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<(), SignInError> {
        let credentials = Credentials::parse(username, password)?;

        let response = auth::login(&self.api, &credentials)
            .await
            .inspect_err(|e| error!(error = %e, "Sign in failed"))?;

        info!(user_id = %response.id, "Signed in");
        self.session.begin_sign_in(TokenPair::from(response)).await;
        self.ensure_profile().await;
        Ok(())
    }

    /// Delete the stored tokens and reset the session.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        info!("Signed out");
    }

    /// Fetch the profile if a token is held and no profile is.
    ///
    /// The session stops loading whether or not the fetch succeeds.
    #[instrument(skip(self))]
    pub async fn ensure_profile(&self) -> Option<User> {
        let epoch = self.session.epoch();
        let state = self.session.snapshot();
        if !state.is_authenticated() {
            return None;
        }
        if let Some(user) = state.user() {
            return Some(user.clone());
        }

        match self.http.execute::<User>(auth::me()).await {
            Ok(user) if self.session.set_user(epoch, user.clone()) => {
                debug!(user_id = %user.id, "Profile loaded");
                Some(user)
            }
            Ok(_) => {
                debug!("Session changed while loading the profile");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch user data");
                self.session.mark_loaded();
                None
            }
        }
    }

    /// The access token as an opaque session handle.
    #[must_use]
    pub fn session(&self) -> Option<SecretString> {
        self.session.access_token()
    }

    /// Protection offered to the stored tokens.
    #[must_use]
    pub fn security_level(&self) -> SecurityLevel {
        self.session.tokens().security_level()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.session.snapshot().is_loading()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.session.snapshot().phase()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Wait until the session has reached a stable decision.
    pub async fn wait_until_loaded(&self) -> SessionState {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = rx.wait_for(|state| !state.is_loading()).await;
        self.session.snapshot()
    }
}
