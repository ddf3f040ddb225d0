//! Federated login: look up an asserted identity, provisioning an account
//! the first time it is seen.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::auth::outcome::Outcome;
use crate::auth::strategy::{Credentials, Strategy};
use crate::users::{RepositoryError, UserRepository};

pub const FEDERATED_STRATEGY: &str = "federated";

/// Accepts a provider identity assertion and resolves it to a user.
///
/// A first-seen `federated_id` silently becomes a new account carrying the
/// provider display name. There is deliberately no linking to an existing
/// local account that happens to share the name.
pub struct FederatedStrategy {
    repository: Arc<dyn UserRepository>,
}

impl FederatedStrategy {
    #[must_use]
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Strategy for FederatedStrategy {
    fn name(&self) -> &'static str {
        FEDERATED_STRATEGY
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<Outcome> {
        let Credentials::Assertion(assertion) = credentials else {
            bail!("federated strategy requires an identity assertion");
        };

        if let Some(user) = self
            .repository
            .find_by_federated_id(&assertion.federated_id)
            .await
            .context("federated id lookup failed")?
        {
            return Ok(Outcome::Success(user));
        }

        match self
            .repository
            .create_federated(&assertion.display_name, &assertion.federated_id)
            .await
        {
            Ok(user) => {
                info!(
                    user_id = %user.id,
                    "provisioned account for first-seen federated identity"
                );
                Ok(Outcome::Success(user))
            }
            // Lost a provisioning race; the winner's record is authoritative.
            Err(RepositoryError::Duplicate { .. }) => {
                let user = self
                    .repository
                    .find_by_federated_id(&assertion.federated_id)
                    .await
                    .context("re-lookup after duplicate create failed")?
                    .context("federated account vanished after duplicate create")?;
                Ok(Outcome::Success(user))
            }
            Err(err) => Err(err).context("failed to provision federated account"),
        }
    }
}
