//! In-memory user repository, used by tests and DSN-less development.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{RepositoryError, UserRepository};
use super::{now_unix, User};

#[derive(Default)]
struct Inner {
    by_id: HashMap<Uuid, User>,
    // Secondary indexes; entries point at by_id keys. Only local accounts
    // are indexed by username, mirroring the partial unique index in
    // `sql/schema.sql`: provider display names neither block a local
    // registration nor answer a username lookup.
    by_username: HashMap<String, Uuid>,
    by_federated_id: HashMap<String, Uuid>,
}

/// A `HashMap`-backed [`UserRepository`].
///
/// Uniqueness checks and inserts happen under a single write lock, so two
/// concurrent creations for the same key resolve the same way the database
/// constraint does: one winner, one `Duplicate` error.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user, used to exercise the deleted-principal session path.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.by_id.remove(&id) else {
            return false;
        };
        if user.federated_id.is_none() {
            inner.by_username.remove(&user.username);
        }
        if let Some(federated_id) = &user.federated_id {
            inner.by_federated_id.remove(federated_id);
        }
        true
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_username
            .get(username)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_federated_id(
        &self,
        federated_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_federated_id
            .get(federated_id)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&id).cloned())
    }

    async fn create_local(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.by_username.contains_key(username) {
            return Err(RepositoryError::duplicate("username", username));
        }

        let now = now_unix();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: Some(password_hash.to_string()),
            federated_id: None,
            created_at_unix: now,
            updated_at_unix: now,
        };
        inner.by_username.insert(username.to_string(), user.id);
        inner.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_federated(
        &self,
        username: &str,
        federated_id: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.by_federated_id.contains_key(federated_id) {
            return Err(RepositoryError::duplicate("federated_id", federated_id));
        }

        let now = now_unix();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: None,
            federated_id: Some(federated_id.to_string()),
            created_at_unix: now,
            updated_at_unix: now,
        };
        inner
            .by_federated_id
            .insert(federated_id.to_string(), user.id);
        inner.by_id.insert(user.id, user.clone());
        Ok(user)
    }
}
