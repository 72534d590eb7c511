//! Credential persistence.
//!
//! Storage is a flat string key-value space: tokens are stored raw and
//! identity records as JSON text, under the key names
//! [`Scope`](gatehouse_core::Scope) dictates. [`CredentialStore`] layers the
//! scope-aware view on top of any [`KeyValueStore`] backend.

mod file;
mod memory;

use std::sync::Arc;

use gatehouse_core::{Identity, Scope};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors surfaced by store backends.
///
/// Malformed *values* never error: an unparsable identity record reads as
/// an empty one. These variants cover backend faults only.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a record for storage failed.
    #[error("state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A flat string key-value store.
///
/// Implementations must make `set_many` and `remove_many` atomic from the
/// point of view of other readers of the same backend, so a credential
/// (token + identity) is never observable half-written.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend faults, never for absent keys.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the removal.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Store several entries in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the entries.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several keys in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the removals.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// The persisted credential for one scope.
///
/// A missing token means logged out regardless of what the identity slot
/// holds; stale identity records without a token are inert.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Scope this credential was read for.
    pub scope: Scope,
    /// Bearer token, if the scope is logged in.
    pub token: Option<SecretString>,
    /// Identity record stored at login. Empty when absent or unparsable.
    pub identity: Identity,
}

impl Credential {
    /// An empty credential for `scope`.
    #[must_use]
    pub fn empty(scope: Scope) -> Self {
        Self {
            scope,
            token: None,
            identity: Identity::default(),
        }
    }

    /// Whether a token is present.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

/// Scope-aware credential view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Wrap a backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// An in-memory store, mainly for tests and short-lived tools.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Read the credential for `scope`.
    ///
    /// Malformed identity JSON degrades to an empty identity rather than
    /// failing: a broken record must never lock the user out of logging
    /// in again.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself fails.
    pub fn get(&self, scope: Scope) -> Result<Credential, StoreError> {
        let token = self.store.get(scope.token_key())?.map(SecretString::from);

        let identity = match self.store.get(scope.identity_key())? {
            None => Identity::default(),
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(%scope, error = %e, "stored identity is unreadable, treating as empty");
                Identity::default()
            }),
        };

        Ok(Credential {
            scope,
            token,
            identity,
        })
    }

    /// Persist a login for `scope`: token and identity together.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be serialized or the
    /// backend cannot persist the entries.
    pub fn set(
        &self,
        scope: Scope,
        token: &SecretString,
        identity: &Identity,
    ) -> Result<(), StoreError> {
        let identity_json = serde_json::to_string(identity)?;
        self.store.set_many(&[
            (scope.token_key(), token.expose_secret()),
            (scope.identity_key(), identity_json.as_str()),
        ])
    }

    /// Remove both slots for `scope`. The other scope is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the removals.
    pub fn clear(&self, scope: Scope) -> Result<(), StoreError> {
        self.store
            .remove_many(&[scope.token_key(), scope.identity_key()])
    }
}
