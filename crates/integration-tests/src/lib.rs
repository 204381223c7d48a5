//! Integration tests for the Tote shopping client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tote-integration-tests
//! ```
//!
//! # Fake backend
//!
//! [`FakeBackend`] is an in-process `axum` server on an ephemeral port that
//! speaks the subset of the REST API the client uses. It issues numbered
//! tokens, counts calls per endpoint and can be told to expire the current
//! access token, slow down or fail refreshes, or fail profile fetches.
//!
//! ```rust,ignore
//! let backend = FakeBackend::start().await?;
//! let tokens = backend.issue_tokens();
//! backend.expire_access_token();
//! // ... drive a client against backend.config(dir) ...
//! assert_eq!(backend.refresh_calls(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tote_client::ClientConfig;
use tote_client::storage::TokenPair;
use url::Url;

/// Username accepted by the fake backend.
pub const USERNAME: &str = "emilys";
/// Password accepted by the fake backend.
pub const PASSWORD: &str = "emilyspass";
/// Id of the user behind [`USERNAME`].
pub const USER_ID: i64 = 1;

/// Counters and switches shared with the request handlers.
#[derive(Default)]
struct BackendState {
    issued: AtomicU64,
    tokens: Mutex<Option<(String, String)>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    me_calls: AtomicUsize,
    catalog_calls: AtomicUsize,
    refresh_delay_ms: AtomicU64,
    me_delay_ms: AtomicU64,
    fail_refresh: AtomicBool,
    fail_me: AtomicBool,
}

impl BackendState {
    /// Mint a new pair and make it the only valid one.
    fn issue(&self) -> (String, String) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let pair = (format!("access-{n}"), format!("refresh-{n}"));
        *self.lock_tokens() = Some(pair.clone());
        pair
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, Option<(String, String)>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn access_is_valid(&self, token: &str) -> bool {
        self.lock_tokens()
            .as_ref()
            .is_some_and(|(access, _)| access == token)
    }

    fn refresh_is_valid(&self, token: &str) -> bool {
        self.lock_tokens()
            .as_ref()
            .is_some_and(|(_, refresh)| refresh == token)
    }
}

/// A running fake of the REST backend.
pub struct FakeBackend {
    base_url: Url,
    state: Arc<BackendState>,
    task: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeBackend {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(BackendState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = Url::parse(&format!("http://{}", listener.local_addr()?))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let app = router(Arc::clone(&state));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            state,
            task,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self, data_dir: &std::path::Path) -> ClientConfig {
        ClientConfig::new(self.base_url.clone(), data_dir)
    }

    /// Issue a fresh valid token pair, as if a sign-in happened elsewhere.
    #[must_use]
    pub fn issue_tokens(&self) -> TokenPair {
        let (access, refresh) = self.state.issue();
        TokenPair {
            access_token: SecretString::from(access),
            refresh_token: SecretString::from(refresh),
        }
    }

    /// Stop accepting the current access token. The refresh token stays
    /// valid.
    pub fn expire_access_token(&self) {
        if let Some((access, _)) = self.state.lock_tokens().as_mut() {
            access.push_str("-expired");
        }
    }

    /// Delay every refresh response.
    pub fn set_refresh_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.refresh_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Hold every `/auth/me` response for `delay`.
    pub fn set_me_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.me_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Reject every refresh with a 401.
    pub fn fail_refresh(&self, fail: bool) {
        self.state.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Answer every profile fetch with a 500.
    pub fn fail_me(&self, fail: bool) {
        self.state.fail_me.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.state.login_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn me_calls(&self) -> usize {
        self.state.me_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn catalog_calls(&self) -> usize {
        self.state.catalog_calls.load(Ordering::SeqCst)
    }
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/products", get(products))
        .route("/products/categories", get(categories))
        .route("/products/category-list", get(category_list))
        .route("/products/category/{slug}", get(category_products))
        .route("/products/{id}", get(product))
        .with_state(state)
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
    expires_in_mins: Option<u32>,
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<LoginBody>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if body.username != USERNAME || body.password != PASSWORD {
        return message(StatusCode::BAD_REQUEST, "Invalid credentials");
    }

    let (access, refresh) = state.issue();
    let mut profile = user_json();
    if let Some(fields) = profile.as_object_mut() {
        fields.insert("accessToken".into(), json!(access));
        fields.insert("refreshToken".into(), json!(refresh));
    }
    Json(profile).into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<RefreshBody>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if body.expires_in_mins.is_none() {
        return message(StatusCode::BAD_REQUEST, "expiresInMins is required");
    }
    if state.fail_refresh.load(Ordering::SeqCst) || !state.refresh_is_valid(&body.refresh_token) {
        return message(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }

    let (access, refresh) = state.issue();
    Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.me_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if !token.is_some_and(|token| state.access_is_valid(token)) {
        return message(StatusCode::UNAUTHORIZED, "Token Expired!");
    }
    if state.fail_me.load(Ordering::SeqCst) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Profile unavailable");
    }

    Json(user_json()).into_response()
}

fn user_json() -> Value {
    json!({
        "id": USER_ID,
        "username": USERNAME,
        "email": "emily.johnson@x.dummyjson.com",
        "firstName": "Emily",
        "lastName": "Johnson",
        "gender": "female",
        "image": "https://dummyjson.com/icon/emilys/128",
        "role": "admin",
    })
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Deserialize)]
struct PageParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    30
}

fn catalog() -> Vec<Value> {
    vec![
        json!({"id": 1, "title": "iPhone 9", "category": "smartphones", "brand": "Apple",
               "price": 549, "discountPercentage": 12.96, "rating": 4.69, "stock": 94,
               "thumbnail": "https://cdn.dummyjson.com/1.png"}),
        json!({"id": 2, "title": "Galaxy S8", "category": "smartphones", "brand": "Samsung",
               "price": 499, "discountPercentage": 10, "rating": 4.09, "stock": 36,
               "thumbnail": "https://cdn.dummyjson.com/2.png"}),
        json!({"id": 3, "title": "MacBook Pro", "category": "laptops", "brand": "Apple",
               "price": 1749, "discountPercentage": 11.02, "rating": 4.57, "stock": 83,
               "thumbnail": "https://cdn.dummyjson.com/3.png"}),
        json!({"id": 4, "title": "Surface Laptop 4", "category": "laptops", "brand": "Microsoft",
               "price": 1499, "discountPercentage": 10.23, "rating": 4.43, "stock": 68,
               "thumbnail": "https://cdn.dummyjson.com/4.png"}),
    ]
}

fn page_of(products: Vec<Value>, params: &PageParams) -> Value {
    let total = products.len();
    let window: Vec<Value> = products
        .into_iter()
        .skip(params.skip)
        .take(params.limit)
        .collect();
    json!({ "products": window, "total": total, "skip": params.skip, "limit": params.limit })
}

async fn products(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    state.catalog_calls.fetch_add(1, Ordering::SeqCst);
    Json(page_of(catalog(), &params))
}

async fn category_products(
    State(state): State<Arc<BackendState>>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    state.catalog_calls.fetch_add(1, Ordering::SeqCst);
    let matching = catalog()
        .into_iter()
        .filter(|p| p["category"] == slug.as_str())
        .collect();
    Json(page_of(matching, &params))
}

async fn product(State(state): State<Arc<BackendState>>, Path(id): Path<i64>) -> Response {
    state.catalog_calls.fetch_add(1, Ordering::SeqCst);
    catalog()
        .into_iter()
        .find(|p| p["id"] == id)
        .map_or_else(
            || message(StatusCode::NOT_FOUND, &format!("Product with id '{id}' not found")),
            |p| Json(p).into_response(),
        )
}

async fn categories(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.catalog_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        {"slug": "laptops", "name": "Laptops", "url": "https://dummyjson.com/products/category/laptops"},
        {"slug": "smartphones", "name": "Smartphones", "url": "https://dummyjson.com/products/category/smartphones"},
    ]))
}

async fn category_list(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.catalog_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!(["laptops", "smartphones"]))
}
