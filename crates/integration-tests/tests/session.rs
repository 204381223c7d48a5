//! Integration tests for session restore, sign-in and sign-out.
//!
//! Run with: cargo test -p tote-integration-tests

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::ExposeSecret;
use tote_client::storage::{MemorySecureStore, MemoryStore, SecurityLevel, TokenStore};
use tote_client::{SessionPhase, ShopClient, SignInError};
use tote_core::CredentialsError;
use tote_integration_tests::{FakeBackend, PASSWORD, USER_ID, USERNAME};

type Shop = ShopClient<MemorySecureStore, MemoryStore>;

fn client(backend: &FakeBackend, secure: &MemorySecureStore) -> Shop {
    let dir = tempfile::tempdir().unwrap();
    ShopClient::new(&backend.config(dir.path()), secure.clone(), MemoryStore::new()).unwrap()
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_restore_without_stored_tokens() {
    let backend = FakeBackend::start().await.unwrap();
    let shop = client(&backend, &MemorySecureStore::new());

    assert!(shop.session().is_loading());
    assert_eq!(shop.session().restore().await, SessionPhase::Unauthenticated);
    assert!(!shop.session().is_loading());
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.me_calls(), 0);
}

#[tokio::test]
async fn test_restore_refreshes_and_loads_profile() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let issued = backend.issue_tokens();
    TokenStore::new(secure.clone()).save(&issued).await;

    let shop = client(&backend, &secure);
    let phase = shop.session().restore().await;

    assert_eq!(phase, SessionPhase::AuthenticatedWithProfile);
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(shop.user_id().unwrap().as_i64(), USER_ID);

    // The refreshed pair replaced the stored one.
    let stored = TokenStore::new(secure).load().await.unwrap();
    assert_ne!(
        stored.access_token.expose_secret(),
        issued.access_token.expose_secret()
    );
    assert_eq!(
        shop.session().session().unwrap().expose_secret(),
        stored.access_token.expose_secret()
    );
}

#[tokio::test]
async fn test_restore_keeps_stored_tokens_when_refresh_fails() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let issued = backend.issue_tokens();
    TokenStore::new(secure.clone()).save(&issued).await;
    backend.fail_refresh(true);
    backend.fail_me(true);

    let shop = client(&backend, &secure);
    let phase = shop.session().restore().await;

    assert_eq!(phase, SessionPhase::AuthenticatedNoProfile);
    let state = shop.session().state();
    assert!(!state.is_loading());
    assert!(state.user().is_none());
    assert_eq!(
        state.access_token().unwrap().expose_secret(),
        issued.access_token.expose_secret()
    );
    assert!(TokenStore::new(secure).load().await.is_some());
}

#[tokio::test]
async fn test_restore_runs_once() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    TokenStore::new(secure.clone())
        .save(&backend.issue_tokens())
        .await;

    let shop = client(&backend, &secure);
    shop.session().restore().await;
    shop.session().restore().await;

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.me_calls(), 1);
}

#[tokio::test]
async fn test_restore_from_disk_after_sign_in() {
    let backend = FakeBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = backend.config(dir.path());

    let first = ShopClient::on_disk(&config).unwrap();
    first.session().restore().await;
    first.session().sign_in(USERNAME, PASSWORD).await.unwrap();
    drop(first);

    let second = ShopClient::on_disk(&config).unwrap();
    assert_eq!(
        second.session().restore().await,
        SessionPhase::AuthenticatedWithProfile
    );
    assert_eq!(second.user_id().unwrap().as_i64(), USER_ID);
    assert_eq!(second.session().security_level(), SecurityLevel::Fallback);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restore_stays_loading_until_slow_profile_arrives() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    TokenStore::new(secure.clone())
        .save(&backend.issue_tokens())
        .await;
    backend.set_me_delay(Duration::from_millis(200));

    let shop = client(&backend, &secure);
    let mut rx = shop.session().subscribe();
    let restore = {
        let shop = shop.clone();
        tokio::spawn(async move { shop.session().restore().await })
    };

    let mut observed = Vec::new();
    let settled = loop {
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        if !state.is_loading() {
            break state;
        }
        observed.push(state);
    };

    assert_eq!(restore.await.unwrap(), SessionPhase::AuthenticatedWithProfile);
    assert!(
        observed
            .iter()
            .all(|state| state.phase() != SessionPhase::Unauthenticated),
        "observed {observed:?}"
    );
    assert!(
        observed
            .iter()
            .any(|state| state.phase() == SessionPhase::AuthenticatedNoProfile),
        "observed {observed:?}"
    );

    // The first settled state is the final one.
    assert_eq!(settled.phase(), SessionPhase::AuthenticatedWithProfile);
    assert!(!rx.has_changed().unwrap());
    assert_eq!(shop.session().phase(), SessionPhase::AuthenticatedWithProfile);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sign_out_during_restore_stays_signed_out() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    TokenStore::new(secure.clone())
        .save(&backend.issue_tokens())
        .await;
    backend.set_refresh_delay(Duration::from_millis(300));

    let shop = client(&backend, &secure);
    let restore = {
        let shop = shop.clone();
        tokio::spawn(async move { shop.session().restore().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    shop.session().sign_out().await;

    assert_eq!(restore.await.unwrap(), SessionPhase::Unauthenticated);
    assert!(!shop.session().is_loading());
    assert!(shop.session().session().is_none());
    assert!(TokenStore::new(secure).load().await.is_none());
    assert_eq!(backend.me_calls(), 0);
}

// ============================================================================
// Sign in / sign out
// ============================================================================

#[tokio::test]
async fn test_sign_in_loads_profile() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = client(&backend, &secure);
    shop.session().restore().await;

    let rx = shop.session().subscribe();
    shop.session().sign_in(USERNAME, PASSWORD).await.unwrap();

    let state = shop.session().wait_until_loaded().await;
    assert_eq!(state.phase(), SessionPhase::AuthenticatedWithProfile);
    assert_eq!(state.user().unwrap().username, USERNAME);
    assert!(rx.has_changed().unwrap());

    assert!(TokenStore::new(secure).load().await.is_some());
    assert_eq!(backend.login_calls(), 1);
    assert_eq!(backend.me_calls(), 1);
}

#[tokio::test]
async fn test_sign_in_rejects_empty_credentials_without_request() {
    let backend = FakeBackend::start().await.unwrap();
    let shop = client(&backend, &MemorySecureStore::new());
    shop.session().restore().await;

    let err = shop.session().sign_in("", PASSWORD).await.unwrap_err();
    assert!(matches!(
        err,
        SignInError::Validation(CredentialsError::EmptyUsername)
    ));
    let err = shop.session().sign_in(USERNAME, "").await.unwrap_err();
    assert!(matches!(
        err,
        SignInError::Validation(CredentialsError::EmptyPassword)
    ));
    assert_eq!(backend.login_calls(), 0);
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_leaves_session_alone() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = client(&backend, &secure);
    shop.session().restore().await;

    let err = shop.session().sign_in(USERNAME, "wrong").await.unwrap_err();
    assert!(matches!(err, SignInError::Rejected(_)));

    let state = shop.session().state();
    assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    assert!(!state.is_loading());
    assert!(TokenStore::new(secure).load().await.is_none());
}

#[tokio::test]
async fn test_sign_out_clears_everything() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = client(&backend, &secure);
    shop.session().restore().await;
    shop.session().sign_in(USERNAME, PASSWORD).await.unwrap();

    shop.session().sign_out().await;

    let state = shop.session().state();
    assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    assert!(state.access_token().is_none());
    assert!(state.refresh_token().is_none());
    assert!(state.user().is_none());
    assert!(TokenStore::new(secure).load().await.is_none());
}
