//! Authentication endpoints.
//!
//! Login and refresh always go through the base [`ApiClient`], never the
//! re-authenticating wrapper, so a rejected refresh cannot trigger another
//! refresh.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tote_core::{Credentials, LoginResponse, RefreshResponse};
use tracing::instrument;

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;

const LOGIN_PATH: &str = "auth/login";
const REFRESH_PATH: &str = "auth/refresh";
const ME_PATH: &str = "auth/me";

/// Request body for `POST /auth/login`.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Request body for `POST /auth/refresh`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
    expires_in_mins: u32,
}

/// Exchange credentials for a token pair and a partial profile.
///
/// # Errors
///
/// Returns `ApiError::Status` if the backend rejects the credentials, or any
/// transport error from [`ApiClient::execute`].
#[instrument(skip(api, credentials), fields(username = %credentials.username()))]
pub async fn login(api: &ApiClient, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
    let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
        username: credentials.username(),
        password: credentials.password(),
    })?;

    api.execute(&request, None).await
}

/// Exchange a refresh token for a new token pair.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` or `ApiError::Status` if the refresh
/// token is rejected, or any transport error from [`ApiClient::execute`].
#[instrument(skip(api, refresh_token))]
pub async fn refresh(
    api: &ApiClient,
    refresh_token: &SecretString,
    expires_in_mins: u32,
) -> Result<RefreshResponse, ApiError> {
    let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
        refresh_token: refresh_token.expose_secret(),
        expires_in_mins,
    })?;

    api.execute(&request, None).await
}

/// Request for the signed-in user's full profile. Needs a bearer token.
#[must_use]
pub fn me() -> ApiRequest {
    ApiRequest::get(ME_PATH)
}
