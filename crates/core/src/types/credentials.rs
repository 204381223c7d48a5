//! Sign-in credentials.

use core::fmt;

/// Errors that can occur when validating [`Credentials`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// The username is empty or whitespace.
    #[error("username cannot be empty")]
    EmptyUsername,
    /// The password is empty.
    #[error("password cannot be empty")]
    EmptyPassword,
}

/// A validated username/password pair.
///
/// Construction goes through [`Credentials::parse`], so a value of this type
/// never carries an empty field and can be sent to the login endpoint without
/// further checks.
///
/// ## Examples
///
/// ```
/// use tote_core::Credentials;
///
/// assert!(Credentials::parse("emilys", "emilyspass").is_ok());
/// assert!(Credentials::parse("", "emilyspass").is_err());
/// assert!(Credentials::parse("emilys", "").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Validate a username and password.
    ///
    /// Surrounding whitespace is trimmed from the username. The password is
    /// taken verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the username (after trimming) or the password is
    /// empty.
    pub fn parse(username: &str, password: &str) -> Result<Self, CredentialsError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CredentialsError::EmptyUsername);
        }

        if password.is_empty() {
            return Err(CredentialsError::EmptyPassword);
        }

        Ok(Self {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let creds = Credentials::parse("  emilys ", "emilyspass").unwrap();
        assert_eq!(creds.username(), "emilys");
        assert_eq!(creds.password(), "emilyspass");
    }

    #[test]
    fn test_parse_empty_username() {
        assert_eq!(
            Credentials::parse("   ", "secret"),
            Err(CredentialsError::EmptyUsername)
        );
    }

    #[test]
    fn test_parse_empty_password() {
        assert_eq!(
            Credentials::parse("emilys", ""),
            Err(CredentialsError::EmptyPassword)
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::parse("emilys", "emilyspass").unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("emilys"));
        assert!(!debug.contains("emilyspass"));
    }
}
