//! Integration tests for the re-authenticating HTTP client.
//!
//! Every test runs against an in-process fake backend, so no network access
//! is needed.
//!
//! Run with: cargo test -p tote-integration-tests

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::ExposeSecret;
use tote_client::api::auth;
use tote_client::storage::{MemorySecureStore, MemoryStore, TokenStore};
use tote_client::{ApiError, SessionPhase, ShopClient};
use tote_core::User;
use tote_integration_tests::{FakeBackend, PASSWORD, USER_ID, USERNAME};

type Shop = ShopClient<MemorySecureStore, MemoryStore>;

/// A client whose session was restored from tokens the backend issued.
async fn signed_in(backend: &FakeBackend, secure: &MemorySecureStore) -> Shop {
    TokenStore::new(secure.clone())
        .save(&backend.issue_tokens())
        .await;

    let dir = tempfile::tempdir().unwrap();
    let shop = ShopClient::new(&backend.config(dir.path()), secure.clone(), MemoryStore::new())
        .unwrap();
    assert_eq!(
        shop.session().restore().await,
        SessionPhase::AuthenticatedWithProfile
    );
    shop
}

// ============================================================================
// Single-flight refresh
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_401s_share_one_refresh() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    let refreshes_before = backend.refresh_calls();
    backend.expire_access_token();
    backend.set_refresh_delay(Duration::from_millis(200));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let shop = shop.clone();
            tokio::spawn(async move { shop.http().execute::<User>(auth::me()).await })
        })
        .collect();

    for task in tasks {
        let user = task.await.unwrap().unwrap();
        assert_eq!(user.id.as_i64(), USER_ID);
    }

    assert_eq!(backend.refresh_calls() - refreshes_before, 1);

    // Every request ends up on the same refreshed token, which is persisted.
    let held = shop.session().session().unwrap();
    let stored = TokenStore::new(secure.clone()).load().await.unwrap();
    assert_eq!(held.expose_secret(), stored.access_token.expose_secret());
}

#[tokio::test]
async fn test_late_401_reuses_completed_refresh() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    let refreshes_before = backend.refresh_calls();
    backend.expire_access_token();

    shop.http().execute::<User>(auth::me()).await.unwrap();
    shop.http().execute::<User>(auth::me()).await.unwrap();

    assert_eq!(backend.refresh_calls() - refreshes_before, 1);
}

#[tokio::test]
async fn test_request_retried_once_after_refresh() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    let me_before = backend.me_calls();
    backend.expire_access_token();
    shop.http().execute::<User>(auth::me()).await.unwrap();

    // The rejected attempt and exactly one retry.
    assert_eq!(backend.me_calls() - me_before, 2);
}

// ============================================================================
// Unrecoverable sessions
// ============================================================================

#[tokio::test]
async fn test_refresh_failure_forces_logout() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    backend.expire_access_token();
    backend.fail_refresh(true);

    let err = shop.http().execute::<User>(auth::me()).await.unwrap_err();
    assert!(matches!(err, ApiError::RefreshFailed(_)), "got {err:?}");

    let state = shop.session().state();
    assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    assert!(!state.is_loading());
    assert!(state.user().is_none());
    assert!(TokenStore::new(secure).load().await.is_none());
}

#[tokio::test]
async fn test_concurrent_failures_share_one_logout() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    let refreshes_before = backend.refresh_calls();
    backend.expire_access_token();
    backend.fail_refresh(true);
    backend.set_refresh_delay(Duration::from_millis(100));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let shop = shop.clone();
            tokio::spawn(async move { shop.http().execute::<User>(auth::me()).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_err());
    }
    assert_eq!(backend.refresh_calls() - refreshes_before, 1);
    assert_eq!(shop.session().phase(), SessionPhase::Unauthenticated);
}

#[tokio::test]
async fn test_unauthenticated_401_surfaces_unauthorized() {
    let backend = FakeBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let shop = ShopClient::new(
        &backend.config(dir.path()),
        MemorySecureStore::new(),
        MemoryStore::new(),
    )
    .unwrap();
    shop.session().restore().await;

    let err = shop.http().execute::<User>(auth::me()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized), "got {err:?}");
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(shop.session().phase(), SessionPhase::Unauthenticated);
}

// ============================================================================
// Sign-out racing a refresh
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sign_out_during_refresh_stays_signed_out() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    let refreshes_before = backend.refresh_calls();
    backend.expire_access_token();
    backend.set_refresh_delay(Duration::from_millis(300));

    let task = {
        let shop = shop.clone();
        tokio::spawn(async move { shop.http().execute::<User>(auth::me()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    shop.session().sign_out().await;

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ApiError::RefreshFailed(_)), "got {err:?}");
    assert_eq!(backend.refresh_calls() - refreshes_before, 1);

    let state = shop.session().state();
    assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    assert!(state.access_token().is_none());
    assert!(TokenStore::new(secure).load().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sign_in_during_refresh_keeps_new_session() {
    let backend = FakeBackend::start().await.unwrap();
    let secure = MemorySecureStore::new();
    let shop = signed_in(&backend, &secure).await;

    backend.expire_access_token();
    backend.set_refresh_delay(Duration::from_millis(300));

    let task = {
        let shop = shop.clone();
        tokio::spawn(async move { shop.http().execute::<User>(auth::me()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    shop.session().sign_in(USERNAME, PASSWORD).await.unwrap();
    let signed_in_token = shop.session().session().unwrap();

    assert!(task.await.unwrap().is_err());

    let state = shop.session().state();
    assert_eq!(state.phase(), SessionPhase::AuthenticatedWithProfile);
    assert_eq!(
        state.access_token().unwrap().expose_secret(),
        signed_in_token.expose_secret()
    );
    let stored = TokenStore::new(secure).load().await.unwrap();
    assert_eq!(
        stored.access_token.expose_secret(),
        signed_in_token.expose_secret()
    );
}
