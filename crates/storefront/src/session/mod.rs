//! Client-side session persistence.
//!
//! The session is a small key/value map holding the credential pair and the
//! identity of the logged-in user. Storage is pluggable through
//! [`SessionStore`]; [`Session`] layers typed accessors on top.

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use crafted_roots_core::{CredentialPair, SessionIdentity, UserRole};
use secrecy::SecretString;
use thiserror::Error;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Session storage errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A persisted session entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    Username,
    Role,
}

impl SessionKey {
    /// Every key, in storage order.
    pub const ALL: [Self; 4] = [
        Self::AccessToken,
        Self::RefreshToken,
        Self::Username,
        Self::Role,
    ];

    /// The key name used in persistent storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::Username => "username",
            Self::Role => "role",
        }
    }

    /// Older clients stored tokens under camelCase names.
    #[must_use]
    pub const fn legacy_name(self) -> Option<&'static str> {
        match self {
            Self::AccessToken => Some("accessToken"),
            Self::RefreshToken => Some("refreshToken"),
            Self::Username | Self::Role => None,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abstraction over session storage backends.
///
/// Implementations must be safe to share across tasks. Writes are last
/// writer wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value. Returns `None` when the key is not set.
    async fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: SessionKey, value: String) -> Result<(), SessionError>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: SessionKey) -> Result<(), SessionError>;

    /// Remove every value.
    async fn clear(&self) -> Result<(), SessionError>;
}

/// Typed view over a [`SessionStore`].
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an existing store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// A session backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// The stored access token, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be read.
    pub async fn access_token(&self) -> Result<Option<SecretString>, SessionError> {
        Ok(self
            .store
            .get(SessionKey::AccessToken)
            .await?
            .map(SecretString::from))
    }

    /// The stored refresh token, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be read.
    pub async fn refresh_token(&self) -> Result<Option<SecretString>, SessionError> {
        Ok(self
            .store
            .get(SessionKey::RefreshToken)
            .await?
            .map(SecretString::from))
    }

    /// Replace the access token after a successful refresh.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be written.
    pub async fn set_access_token(&self, token: &str) -> Result<(), SessionError> {
        self.store
            .set(SessionKey::AccessToken, token.to_owned())
            .await
    }

    /// Persist a fresh login: both tokens and the identity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be written.
    pub async fn store_login(
        &self,
        credentials: &CredentialPair,
        identity: &SessionIdentity,
    ) -> Result<(), SessionError> {
        self.store
            .set(
                SessionKey::AccessToken,
                credentials.access_token().to_owned(),
            )
            .await?;
        self.store
            .set(
                SessionKey::RefreshToken,
                credentials.refresh_token().to_owned(),
            )
            .await?;
        self.store
            .set(SessionKey::Username, identity.username.clone())
            .await?;
        self.store
            .set(SessionKey::Role, identity.role.as_str().to_owned())
            .await
    }

    /// Who is logged in, if anyone.
    ///
    /// A stored username without a role is treated as a buyer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be read.
    pub async fn identity(&self) -> Result<Option<SessionIdentity>, SessionError> {
        let Some(username) = self.store.get(SessionKey::Username).await? else {
            return Ok(None);
        };
        let role = self
            .store
            .get(SessionKey::Role)
            .await?
            .map_or(UserRole::Buyer, |r| UserRole::from(r.as_str()));
        Ok(Some(SessionIdentity::new(username, role)))
    }

    /// Remove tokens and identity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be written.
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.store.clear().await
    }
}
