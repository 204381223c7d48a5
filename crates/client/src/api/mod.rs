//! REST backend client.
//!
//! [`ApiClient`] is the base transport: it builds URLs, attaches an optional
//! bearer token and decodes responses. It never retries and never touches the
//! session, which makes it safe to use for the token refresh call itself.
//! [`AuthenticatedClient`] wraps it with bearer injection from the session and
//! single-flight re-authentication on 401.

pub mod auth;
mod catalog;
mod reauth;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;

pub use catalog::{CatalogClient, Page};
pub use reauth::AuthenticatedClient;

/// A request description that can be sent more than once.
#[derive(Clone)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a request for a `/`-separated path relative to the base URL.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append one path segment verbatim. Reserved characters are
    /// percent-encoded, so `segment` can never escape its position.
    #[must_use]
    pub fn segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if `body` cannot be serialized.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL, for logging.
    #[must_use]
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

// Bodies can carry passwords and refresh tokens.
impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("query", &self.query)
            .field("body", &self.body.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Base HTTP client for the shopping backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve a request to an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the base URL cannot carry a path.
    pub fn url(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(&request.segments);

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        Ok(url)
    }

    /// Send a request and return the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` on network failures.
    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(request)?;
        let mut builder = self.inner.client.request(request.method.clone(), url);

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Send a request and decode a successful JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` on 401, `ApiError::RateLimited` on
    /// 429, `ApiError::Status` on any other non-success status,
    /// `ApiError::Parse` if the body is not the expected JSON, and
    /// `ApiError::Http` on network failures.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let response = self.send(request, bearer).await?;
        decode(response).await
    }
}

/// Decode a response, mapping failure statuses to [`ApiError`].
pub(crate) async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    // Get response body as text first for better error diagnostics
    let response_text = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %response_text.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );
        return Err(ApiError::Status {
            status,
            body: response_text.chars().take(200).collect(),
        });
    }

    serde_json::from_str(&response_text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %response_text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        ApiError::Parse(e)
    })
}
