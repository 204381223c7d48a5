//! User profile types returned by the auth endpoints.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Geographic coordinates of an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Employer information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub department: Option<String>,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// Full user profile from `GET /auth/me`.
///
/// The backend returns many more fields (bank details, crypto wallet, ...)
/// that the client has no use for; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Contact email as reported by the backend (not validated).
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub maiden_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub company: Option<Company>,
}

impl User {
    /// Display name, `"First Last"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Response body of `POST /auth/login`.
///
/// Carries the token pair plus a partial profile. The full [`User`] is
/// fetched separately from `/auth/me` once the tokens are in place.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Response body of `POST /auth/refresh`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_ignores_unknown_fields() {
        let json = r#"{
            "id": 1,
            "username": "emilys",
            "email": "emily.johnson@x.dummyjson.com",
            "firstName": "Emily",
            "lastName": "Johnson",
            "age": 28,
            "bank": { "cardNumber": "9289760655481815" },
            "address": { "address": "626 Main Street", "city": "Phoenix", "stateCode": "MS" }
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId::new(1));
        assert_eq!(user.full_name(), "Emily Johnson");
        assert_eq!(user.age, Some(28));
        assert_eq!(
            user.address.unwrap().state_code.as_deref(),
            Some("MS")
        );
    }

    #[test]
    fn test_login_response_debug_redacts_tokens() {
        let json = r#"{
            "id": 1, "username": "emilys", "email": "e@x.com",
            "firstName": "Emily", "lastName": "Johnson",
            "accessToken": "eyJ.access", "refreshToken": "eyJ.refresh"
        }"#;
        let login: LoginResponse = serde_json::from_str(json).unwrap();
        let debug = format!("{login:?}");
        assert!(!debug.contains("eyJ"));
        assert_eq!(login.access_token, "eyJ.access");
    }
}
