//! Portal credentials.
//!
//! The password sits in a `secrecy` box for the length of a login attempt.
//! Nothing here is ever written to disk.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Password or API key. Formats as `[REDACTED]`.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// The plain value, for typing into a form or an auth header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Username/password pair for one portal.
///
/// Dual-login portals reuse the same pair for the SSO step.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields are non-blank.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.expose().trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug_or_display() {
        let secret = SecretString::new("hunter2-portal");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert!(!format!("{}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2-portal");
    }

    #[test]
    fn test_secret_redaction_survives_nested_formatting() {
        let key = Some(SecretString::from(String::from("sk-live-123")));
        let rendered = format!("{:?} {:#?}", key, key);
        assert!(!rendered.contains("sk-live"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("agent@example.com", "hunter2-portal");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("agent@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_is_complete() {
        assert!(Credentials::new("a", "b").is_complete());
        assert!(!Credentials::new("  ", "b").is_complete());
        assert!(!Credentials::new("a", "").is_complete());
    }
}
