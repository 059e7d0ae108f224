//! Session credential types.
//!
//! A [`CredentialPair`] and a [`SessionIdentity`] are always written together
//! at login and cleared together at logout.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::types::status::UserRole;

/// Access and refresh tokens issued by the backend.
///
/// Tokens are held as [`SecretString`] so they never show up in `Debug`
/// output or logs.
#[derive(Clone)]
pub struct CredentialPair {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl CredentialPair {
    /// Create a credential pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }

    /// The short-lived access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// The long-lived refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Login name.
    pub username: String,
    /// Account role.
    pub role: UserRole,
}

impl SessionIdentity {
    /// Create a session identity.
    #[must_use]
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}
