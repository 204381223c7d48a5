//! Error types for the backend API.

use thiserror::Error;

/// Errors that can occur when talking to the shopping backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend rejected the access token and it could not be recovered.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend answered with an unexpected status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The refresh endpoint rejected the refresh token or was unreachable.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The configured base URL cannot have endpoint paths appended.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether this error ended the session.
    ///
    /// These are the terminal authentication failures after which the user
    /// has to sign in again.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::RefreshFailed(_)
        )
    }
}
