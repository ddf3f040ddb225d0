//! Pluggable authentication strategies.
//!
//! Each mechanism is a named [`Strategy`] registered in a
//! [`StrategyRegistry`] and dispatched by name; all of them share one
//! `authenticate` contract over [`Credentials`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::outcome::Outcome;

pub mod federated;
pub mod local;

pub use self::federated::{FederatedStrategy, FEDERATED_STRATEGY};
pub use self::local::{LocalStrategy, LOCAL_STRATEGY};

/// A stable identity assertion from a federated provider: who the provider
/// says the visitor is, after the redirect/callback handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    /// Provider-scoped identifier, stable across logins.
    pub federated_id: String,
    /// Display name supplied by the provider; becomes the username when an
    /// account is provisioned.
    pub display_name: String,
}

/// Input consumed by a strategy.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { username: String, password: String },
    Assertion(IdentityAssertion),
}

/// A named, swappable verification algorithm turning credentials into a
/// principal.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the verification. `Ok(Failure(..))` is a user-facing rejection;
    /// `Err` is an internal fault and must never read as success.
    async fn authenticate(&self, credentials: Credentials) -> Result<Outcome>;
}

/// Name -> strategy map.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.name(), strategy);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Dispatch to the named strategy.
    ///
    /// # Errors
    /// An unknown strategy name is an internal fault: routes bind strategy
    /// names statically, so reaching this means a wiring bug.
    pub async fn authenticate(&self, name: &str, credentials: Credentials) -> Result<Outcome> {
        let Some(strategy) = self.strategies.get(name) else {
            bail!("unknown authentication strategy: {name}");
        };
        strategy.authenticate(credentials).await
    }
}
