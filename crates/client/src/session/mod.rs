//! Session state and lifecycle.
//!
//! [`SessionStore`] is the single owner of the in-memory session. It
//! publishes every change on a `tokio::sync::watch` channel so the interface
//! shell can gate rendering on [`SessionState::is_loading`] and react to a
//! forced logout. [`SessionManager`] drives the lifecycle on top of it:
//! restore on launch, sign-in, profile fetch and sign-out.
//!
//! # Phases
//!
//! ```text
//! Initializing ──► Restoring ──► AuthenticatedNoProfile ──► AuthenticatedWithProfile
//!      │                                   │
//!      └──────────────► Unauthenticated ◄──┘ (sign-out, forced logout)
//! ```

mod manager;

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tote_core::User;
use tracing::{debug, info};

use crate::storage::{SecureStore, TokenPair, TokenStore};

pub use manager::{SessionManager, SignInError};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Stored tokens have not been looked at yet.
    Initializing,
    /// Stored tokens were found and are being refreshed.
    Restoring,
    /// Tokens are held but the profile is not (yet) loaded.
    AuthenticatedNoProfile,
    /// Tokens and profile are both held.
    AuthenticatedWithProfile,
    /// No tokens.
    Unauthenticated,
}

/// Snapshot of the process-wide session.
///
/// `is_authenticated()` is derived from the access token, so the two can
/// never disagree.
#[derive(Clone)]
pub struct SessionState {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    user: Option<User>,
    is_loading: bool,
    restoring: bool,
    /// Bumped on every sign-in and sign-out.
    epoch: u64,
}

impl SessionState {
    const fn initial() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            user: None,
            is_loading: true,
            restoring: false,
            epoch: 0,
        }
    }

    const fn signed_out(epoch: u64) -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            user: None,
            is_loading: false,
            restoring: false,
            epoch,
        }
    }

    /// The access token, used as an opaque session handle.
    #[must_use]
    pub const fn access_token(&self) -> Option<&SecretString> {
        self.access_token.as_ref()
    }

    #[must_use]
    pub const fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// True until the session has reached a stable decision. Nothing that
    /// depends on authentication should be shown or redirected while set.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        match (&self.access_token, &self.user) {
            (Some(_), Some(_)) => SessionPhase::AuthenticatedWithProfile,
            (Some(_), None) => SessionPhase::AuthenticatedNoProfile,
            (None, _) if self.restoring => SessionPhase::Restoring,
            (None, _) if self.is_loading => SessionPhase::Initializing,
            (None, _) => SessionPhase::Unauthenticated,
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("phase", &self.phase())
            .field("is_loading", &self.is_loading)
            .field("user_id", &self.user.as_ref().map(|u| u.id))
            .finish_non_exhaustive()
    }
}

/// Owner of the in-memory session and its secure persistence.
///
/// Every sign-in and sign-out starts a new epoch. Work that outlives its
/// session (a refresh, a restore, a profile fetch) captures the epoch up
/// front and its result is dropped once the epoch has moved on.
pub struct SessionStore<S> {
    inner: Arc<SessionStoreInner<S>>,
}

struct SessionStoreInner<S> {
    state: watch::Sender<SessionState>,
    tokens: TokenStore<S>,
    /// Held across every storage write so a late write can't land after a
    /// sign-out has cleared storage.
    writes: Mutex<()>,
}

impl<S> Clone for SessionStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SecureStore> SessionStore<S> {
    #[must_use]
    pub fn new(tokens: TokenStore<S>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(SessionStoreInner {
                state,
                tokens,
                writes: Mutex::new(()),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.inner.state.borrow().access_token.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.inner.state.borrow().refresh_token.clone()
    }

    /// Secure persistence behind the session.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore<S> {
        &self.inner.tokens
    }

    /// The current session epoch.
    pub(crate) fn epoch(&self) -> u64 {
        self.inner.state.borrow().epoch
    }

    /// Persist a token pair and make it current, unless the session has
    /// moved past `epoch`. Profile and loading state are kept.
    ///
    /// Returns whether the pair was applied.
    pub(crate) async fn store_tokens(&self, epoch: u64, tokens: TokenPair) -> bool {
        let _writes = self.inner.writes.lock().await;
        if self.epoch() != epoch {
            debug!(epoch, "Dropping tokens from an ended session");
            return false;
        }
        self.inner.tokens.save(&tokens).await;
        self.set_tokens(epoch, tokens)
    }

    /// Make a token pair current without persisting it, unless the session
    /// has moved past `epoch`.
    pub(crate) fn set_tokens(&self, epoch: u64, tokens: TokenPair) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            state.access_token = Some(tokens.access_token);
            state.refresh_token = Some(tokens.refresh_token);
            state.restoring = false;
            true
        })
    }

    /// Persist freshly issued sign-in tokens and start a new epoch. The
    /// previous profile is dropped and the session is loading again until
    /// the new profile arrives.
    pub(crate) async fn begin_sign_in(&self, tokens: TokenPair) {
        let _writes = self.inner.writes.lock().await;
        self.inner.tokens.save(&tokens).await;
        self.inner.state.send_modify(|state| {
            state.access_token = Some(tokens.access_token);
            state.refresh_token = Some(tokens.refresh_token);
            state.user = None;
            state.is_loading = true;
            state.restoring = false;
            state.epoch += 1;
        });
    }

    pub(crate) fn begin_restore(&self) {
        self.inner.state.send_modify(|state| state.restoring = true);
    }

    /// Attach a loaded profile, unless the session has moved past `epoch`.
    pub(crate) fn set_user(&self, epoch: u64, user: User) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            state.user = Some(user);
            state.is_loading = false;
            true
        })
    }

    pub(crate) fn mark_loaded(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.is_loading || state.restoring;
            state.is_loading = false;
            state.restoring = false;
            changed
        });
    }

    /// Clear the session, delete the stored tokens and start a new epoch.
    pub(crate) async fn sign_out(&self) {
        let _writes = self.inner.writes.lock().await;
        self.inner.tokens.clear().await;
        self.end_epoch();
    }

    /// Sign out after an unrecoverable authentication failure in `epoch`.
    /// A session that has already been replaced is left alone.
    pub(crate) async fn force_logout(&self, epoch: u64) {
        let _writes = self.inner.writes.lock().await;
        if self.epoch() != epoch {
            debug!(epoch, "Ignoring logout for an ended session");
            return;
        }
        info!("Session ended by the backend, signing out");
        self.inner.tokens.clear().await;
        self.end_epoch();
    }

    /// Replace the state with the signed-out shape of the next epoch.
    /// Callers hold the write lock.
    fn end_epoch(&self) {
        let epoch = self.epoch() + 1;
        self.inner.state.send_replace(SessionState::signed_out(epoch));
        debug!(epoch, "Session cleared");
    }
}
