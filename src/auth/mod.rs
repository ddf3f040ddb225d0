//! The authentication core: credential hashing, pluggable strategies,
//! session serialization, and the authorization gate.
//!
//! Everything funnels into [`Outcome`]: a strategy either succeeds with a
//! [`crate::users::User`], fails with a user-facing [`Reason`], or
//! propagates an internal fault as an `Err` that the HTTP layer turns into
//! a generic 500. No error path may resolve as authentication success.

pub mod hasher;
pub mod outcome;
pub mod service;
pub mod session;
pub mod strategy;

pub use self::hasher::CredentialHasher;
pub use self::outcome::{Outcome, Reason};
pub use self::service::AuthService;
pub use self::session::{
    MemorySessionStore, PgSessionStore, SessionStore, DEFAULT_SESSION_TTL_SECONDS,
};
pub use self::strategy::{
    Credentials, FederatedStrategy, IdentityAssertion, LocalStrategy, Strategy, StrategyRegistry,
    FEDERATED_STRATEGY, LOCAL_STRATEGY,
};
