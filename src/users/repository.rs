//! The abstract user repository consumed by the authentication core.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::User;

/// Errors surfaced by a [`UserRepository`].
///
/// `Duplicate` is the one variant callers branch on: it is how the
/// account-creation race (two concurrent registrations for the same key)
/// resolves to exactly one persisted record and a deterministic loser.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate {key}: {value}")]
    Duplicate { key: &'static str, value: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub(crate) fn duplicate(key: &'static str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            key,
            value: value.into(),
        }
    }
}

/// Lookup/create operations over identity records.
///
/// Implementations must enforce uniqueness of `username` (for local
/// accounts) and `federated_id` at the storage layer; a violated constraint
/// surfaces as [`RepositoryError::Duplicate`], never as a second record.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_federated_id(
        &self,
        federated_id: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Persist a local account: username + password hash.
    async fn create_local(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Persist a federated account: provider display name + federated id,
    /// no credential material.
    async fn create_federated(
        &self,
        username: &str,
        federated_id: &str,
    ) -> Result<User, RepositoryError>;
}
