//! Session credentials and the local/synchronized mode switch.
//!
//! Whether a mutation is mirrored to the remote API is decided once per
//! operation by resolving a [`SyncMode`] from the credential provider.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::storage::{KeyValueStore, StorageError, keys};

/// Source of the session bearer token.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Look up a credential by key.
    async fn get(&self, key: &str) -> Option<SecretString>;
}

/// Credentials persisted in the key-value store next to the snapshots.
#[derive(Clone)]
pub struct StoredCredentials {
    store: Arc<dyn KeyValueStore>,
}

impl StoredCredentials {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist the session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn set_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.store
            .set(keys::AUTH_TOKEN, token.expose_secret().to_string())
            .await
    }

    /// Forget the session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub async fn clear_token(&self) -> Result<(), StorageError> {
        self.store.remove(keys::AUTH_TOKEN).await
    }
}

#[async_trait]
impl CredentialProvider for StoredCredentials {
    async fn get(&self, key: &str) -> Option<SecretString> {
        match self.store.get(key).await {
            Ok(value) => value
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential, treating as absent");
                None
            }
        }
    }
}

/// A fixed credential, for embedding and tests.
#[derive(Clone, Default)]
pub struct StaticCredential(Option<SecretString>);

impl StaticCredential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(SecretString::from(token.into())))
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn get(&self, key: &str) -> Option<SecretString> {
        if key == keys::AUTH_TOKEN {
            self.0.clone()
        } else {
            None
        }
    }
}

/// Whether mutations stay local or are mirrored to the remote API.
#[derive(Debug, Clone)]
pub enum SyncMode {
    /// No session credential; collections live only in memory and storage.
    Local,
    /// A session credential is present and sent as a bearer token.
    Synchronized(SecretString),
}

impl SyncMode {
    /// Resolve the mode from the current session credential.
    pub async fn resolve(credentials: &dyn CredentialProvider) -> Self {
        credentials
            .get(keys::AUTH_TOKEN)
            .await
            .map_or(Self::Local, Self::Synchronized)
    }

    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        match self {
            Self::Local => None,
            Self::Synchronized(token) => Some(token),
        }
    }

    #[must_use]
    pub const fn is_synchronized(&self) -> bool {
        matches!(self, Self::Synchronized(_))
    }
}
