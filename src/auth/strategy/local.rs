//! Username/password verification against the user repository.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::auth::hasher::CredentialHasher;
use crate::auth::outcome::{Outcome, Reason};
use crate::auth::strategy::{Credentials, Strategy};
use crate::users::UserRepository;

pub const LOCAL_STRATEGY: &str = "local";

pub struct LocalStrategy {
    repository: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
}

impl LocalStrategy {
    #[must_use]
    pub fn new(repository: Arc<dyn UserRepository>, hasher: CredentialHasher) -> Self {
        Self { repository, hasher }
    }
}

#[async_trait]
impl Strategy for LocalStrategy {
    fn name(&self) -> &'static str {
        LOCAL_STRATEGY
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<Outcome> {
        let Credentials::Password { username, password } = credentials else {
            bail!("local strategy requires username/password credentials");
        };

        let Some(user) = self
            .repository
            .find_by_username(&username)
            .await
            .context("username lookup failed")?
        else {
            debug!(%username, "login rejected: unknown username");
            return Ok(Outcome::Failure(Reason::IncorrectUsername));
        };

        // Accounts provisioned from a federated login have no password to
        // compare against.
        let Some(stored_hash) = user.password_hash.as_deref() else {
            debug!(%username, "login rejected: account has no password");
            return Ok(Outcome::Failure(Reason::IncorrectPassword));
        };

        // The comparison is awaited to completion before branching; an
        // unresolved verification must never be treated as a match.
        if self.hasher.verify(&password, stored_hash).await? {
            Ok(Outcome::Success(user))
        } else {
            debug!(%username, "login rejected: password mismatch");
            Ok(Outcome::Failure(Reason::IncorrectPassword))
        }
    }
}
