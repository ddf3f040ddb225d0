//! The assembled authentication service.
//!
//! Owns the hasher, the user repository, the strategy registry, and the
//! session store. Constructed once at startup and handed to route handlers;
//! there is no ambient singleton.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::auth::hasher::CredentialHasher;
use crate::auth::outcome::{Outcome, Reason};
use crate::auth::session::{generate_session_token, hash_session_token, SessionStore};
use crate::auth::strategy::{
    Credentials, FederatedStrategy, LocalStrategy, StrategyRegistry,
};
use crate::users::{RepositoryError, User, UserRepository};

pub struct AuthService {
    repository: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
    registry: StrategyRegistry,
    sessions: Arc<dyn SessionStore>,
}

impl AuthService {
    /// Wire the service: both built-in strategies against the given
    /// repository, sessions in the given store.
    #[must_use]
    pub fn new(repository: Arc<dyn UserRepository>, sessions: Arc<dyn SessionStore>) -> Self {
        Self::with_hasher(repository, sessions, CredentialHasher::default())
    }

    #[must_use]
    pub fn with_hasher(
        repository: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        hasher: CredentialHasher,
    ) -> Self {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(LocalStrategy::new(
            Arc::clone(&repository),
            hasher.clone(),
        )));
        registry.register(Arc::new(FederatedStrategy::new(Arc::clone(&repository))));

        Self {
            repository,
            hasher,
            registry,
            sessions,
        }
    }

    /// Run the named strategy over the given credentials.
    pub async fn authenticate(&self, strategy: &str, credentials: Credentials) -> Result<Outcome> {
        self.registry.authenticate(strategy, credentials).await
    }

    /// Create a local account.
    ///
    /// Username uniqueness is pre-checked before any hashing work, so a
    /// taken name costs nothing; the storage constraint still backstops a
    /// race between two registrations for the same name.
    pub async fn register(&self, username: &str, password: &str) -> Result<Outcome> {
        if self
            .repository
            .find_by_username(username)
            .await
            .context("username pre-check failed")?
            .is_some()
        {
            return Ok(Outcome::Failure(Reason::UsernameTaken));
        }

        let password_hash = self.hasher.hash(password).await?;

        match self.repository.create_local(username, &password_hash).await {
            Ok(user) => Ok(Outcome::Success(user)),
            Err(RepositoryError::Duplicate { .. }) => Ok(Outcome::Failure(Reason::UsernameTaken)),
            Err(err) => Err(err).context("failed to create account"),
        }
    }

    /// Capture only the opaque identifier for the session payload, never
    /// the full record.
    #[must_use]
    pub fn serialize(user: &User) -> Uuid {
        user.id
    }

    /// Resolve a serialized principal id back to its record.
    ///
    /// A deleted account yields `Ok(None)`: the session is simply treated
    /// as unauthenticated.
    pub async fn deserialize(&self, user_id: Uuid) -> Result<Option<User>> {
        self.repository
            .find_by_id(user_id)
            .await
            .context("principal lookup failed")
    }

    /// Issue a session for an authenticated user.
    ///
    /// The session record is fully persisted before the token is returned,
    /// so any request presenting the token observes an authenticated state.
    pub async fn login(&self, user: &User) -> Result<String> {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        self.sessions
            .insert(&token_hash, Self::serialize(user))
            .await?;
        Ok(token)
    }

    /// Resolve a session token to its principal, if the session is live and
    /// the principal still exists.
    pub async fn authenticated_user(&self, token: &str) -> Result<Option<User>> {
        let token_hash = hash_session_token(token);
        let Some(user_id) = self.sessions.lookup(&token_hash).await? else {
            return Ok(None);
        };
        self.deserialize(user_id).await
    }

    /// The authorization gate. Uncertain or failing paths count as not
    /// authenticated.
    pub async fn is_authenticated(&self, token: &str) -> bool {
        match self.authenticated_user(token).await {
            Ok(user) => user.is_some(),
            Err(err) => {
                error!("authentication check failed: {err:?}");
                false
            }
        }
    }

    /// Clear the session. Completes (or fails) before success is reported.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let token_hash = hash_session_token(token);
        self.sessions.delete(&token_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::MemorySessionStore;
    use crate::auth::strategy::LOCAL_STRATEGY;
    use crate::users::MemoryRepository;

    fn service() -> (AuthService, Arc<MemoryRepository>) {
        let repository = Arc::new(MemoryRepository::new());
        let sessions = Arc::new(MemorySessionStore::default());
        let service = AuthService::with_hasher(
            Arc::clone(&repository) as _,
            sessions,
            CredentialHasher::new(4),
        );
        (service, repository)
    }

    #[tokio::test]
    async fn register_pre_checks_username() {
        let (service, _repository) = service();
        let first = service
            .register("alice1234", "Secret123")
            .await
            .expect("register");
        assert!(first.is_success());

        let second = service
            .register("alice1234", "Other456")
            .await
            .expect("no internal fault");
        assert!(matches!(second, Outcome::Failure(Reason::UsernameTaken)));
    }

    #[tokio::test]
    async fn registered_user_can_authenticate() {
        let (service, _repository) = service();
        service
            .register("alice1234", "Secret123")
            .await
            .expect("register");

        let outcome = service
            .authenticate(
                LOCAL_STRATEGY,
                Credentials::Password {
                    username: "alice1234".to_string(),
                    password: "Secret123".to_string(),
                },
            )
            .await
            .expect("authenticate");
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn serialize_then_deserialize_round_trips() {
        let (service, _repository) = service();
        let user = service
            .register("alice1234", "Secret123")
            .await
            .expect("register")
            .into_user()
            .expect("created");

        let id = AuthService::serialize(&user);
        let restored = service
            .deserialize(id)
            .await
            .expect("lookup succeeds")
            .expect("principal exists");
        assert_eq!(restored.id, user.id);
    }

    #[tokio::test]
    async fn deleted_principal_deserializes_to_none() {
        let (service, repository) = service();
        let user = service
            .register("alice1234", "Secret123")
            .await
            .expect("register")
            .into_user()
            .expect("created");
        let token = service.login(&user).await.expect("login");

        assert!(repository.delete(user.id).await);
        assert!(service
            .deserialize(user.id)
            .await
            .expect("lookup succeeds")
            .is_none());
        assert!(!service.is_authenticated(&token).await);
    }

    #[tokio::test]
    async fn login_then_gate_then_logout() {
        let (service, _repository) = service();
        let user = service
            .register("alice1234", "Secret123")
            .await
            .expect("register")
            .into_user()
            .expect("created");

        let token = service.login(&user).await.expect("login");
        assert!(service.is_authenticated(&token).await);

        let authenticated = service
            .authenticated_user(&token)
            .await
            .expect("lookup")
            .expect("session resolves");
        assert_eq!(authenticated.id, user.id);

        service.logout(&token).await.expect("logout");
        assert!(!service.is_authenticated(&token).await);
    }

    #[tokio::test]
    async fn unknown_token_not_authenticated() {
        let (service, _repository) = service();
        assert!(!service.is_authenticated("no-such-token").await);
    }
}
