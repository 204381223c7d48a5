//! Bearer injection and single-flight re-authentication.
//!
//! Every request made through [`AuthenticatedClient`] carries the session's
//! current access token. When the backend answers 401 the client refreshes
//! the token pair and retries the request once with the new access token.
//!
//! Concurrent 401s share one refresh. The in-flight refresh is a
//! [`Shared`] future stored in a mutex-guarded slot: the first caller to find
//! the slot empty (or holding a finished refresh) claims it, everyone else
//! awaits the same future and observes the same outcome. The claim check and
//! the stale-token check happen under the same lock, so a caller whose
//! request failed with a token that has since been replaced reuses the new
//! token instead of starting a second refresh.
//!
//! A refresh belongs to the session epoch it was claimed in. If the user
//! signs out (or in again) while it runs, its tokens are dropped and every
//! waiter gets `ApiError::RefreshFailed`.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::{ApiClient, ApiRequest, auth, decode};
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::storage::{SecureStore, TokenPair};

/// Outcome of a refresh, shared by every waiter.
#[derive(Debug, Clone, Error)]
enum RefreshError {
    /// Nothing to refresh with, so the original 401 stands.
    #[error("no refresh token")]
    NoRefreshToken,
    #[error("{0}")]
    Failed(String),
}

impl From<RefreshError> for ApiError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::NoRefreshToken => Self::Unauthorized,
            RefreshError::Failed(message) => Self::RefreshFailed(message),
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<SecretString, RefreshError>>>;

/// HTTP client that authenticates requests from the session and recovers
/// from expired access tokens.
pub struct AuthenticatedClient<S> {
    inner: Arc<AuthenticatedClientInner<S>>,
}

struct AuthenticatedClientInner<S> {
    api: ApiClient,
    session: SessionStore<S>,
    refresh_expires_in_mins: u32,
    /// The refresh currently in flight, if any.
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl<S> Clone for AuthenticatedClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SecureStore + 'static> AuthenticatedClient<S> {
    #[must_use]
    pub fn new(api: ApiClient, session: SessionStore<S>, refresh_expires_in_mins: u32) -> Self {
        Self {
            inner: Arc::new(AuthenticatedClientInner {
                api,
                session,
                refresh_expires_in_mins,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Send a request with the session's bearer token and decode the JSON
    /// response.
    ///
    /// A 401 triggers one refresh (shared with any concurrent callers) and a
    /// single retry. The retry's result is returned as is.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the original 401 can't be
    /// recovered from because no refresh token is held, or if the retry is
    /// rejected too. Returns `ApiError::RefreshFailed` if the refresh was
    /// rejected (the session is signed out) or the session ended while it
    /// ran. Otherwise any error from [`ApiClient::execute`].
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let token = self.inner.session.access_token();
        let response = self.inner.api.send(&request, token.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        debug!("Access token rejected, re-authenticating");
        let fresh = self.recover(token.as_ref()).await?;
        let retry = self.inner.api.send(&request, Some(&fresh)).await?;
        decode(retry).await
    }

    /// Obtain a usable access token after `stale` was rejected.
    async fn recover(&self, stale: Option<&SecretString>) -> Result<SecretString, ApiError> {
        let refresh = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match slot.as_ref() {
                Some(running) if running.peek().is_none() => running.clone(),
                _ => {
                    if let Some(current) = self.inner.session.access_token()
                        && !same_token(Some(&current), stale)
                    {
                        debug!("Access token already replaced, reusing it");
                        return Ok(current);
                    }

                    let refresh = self.start_refresh();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };

        let outcome = refresh.clone().await;

        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|running| running.ptr_eq(&refresh)) {
            *slot = None;
        }
        drop(slot);

        outcome.map_err(ApiError::from)
    }

    fn start_refresh(&self) -> SharedRefresh {
        let inner = Arc::clone(&self.inner);
        let epoch = inner.session.epoch();
        async move { inner.refresh(epoch).await }.boxed().shared()
    }
}

impl<S: SecureStore> AuthenticatedClientInner<S> {
    /// Run one refresh for the session in `epoch`. Any failure signs that
    /// session out.
    async fn refresh(&self, epoch: u64) -> Result<SecretString, RefreshError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            warn!("No refresh token held, signing out");
            self.session.force_logout(epoch).await;
            return Err(RefreshError::NoRefreshToken);
        };

        match auth::refresh(&self.api, &refresh_token, self.refresh_expires_in_mins).await {
            Ok(response) => {
                let tokens = TokenPair::from(response);
                let access_token = tokens.access_token.clone();
                if !self.session.store_tokens(epoch, tokens).await {
                    warn!("Session ended during token refresh, dropping new tokens");
                    return Err(RefreshError::Failed("session ended during refresh".into()));
                }
                info!("Access token refreshed");
                Ok(access_token)
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed, signing out");
                self.session.force_logout(epoch).await;
                Err(RefreshError::Failed(e.to_string()))
            }
        }
    }
}

fn same_token(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        (None, None) => true,
        _ => false,
    }
}
