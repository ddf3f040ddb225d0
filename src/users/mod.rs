//! Principal (user) model and the repositories that persist it.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod repository;

pub use self::memory::MemoryRepository;
pub use self::postgres::PgUserRepository;
pub use self::repository::{RepositoryError, UserRepository};

/// An authenticated identity record.
///
/// A user is addressable by `username` (local accounts) or by `federated_id`
/// (accounts provisioned from a federated login). Purely federated accounts
/// carry no password hash; local-only accounts carry no federated id.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// bcrypt hash of the password, never the plaintext. Skipped on
    /// serialization so it cannot leak into responses or session payloads.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub federated_id: Option<String>,
    pub created_at_unix: i64,
    pub updated_at_unix: i64,
}

impl User {
    #[must_use]
    pub fn is_federated(&self) -> bool {
        self.federated_id.is_some()
    }
}

/// Seconds since the Unix epoch; clamps a pre-epoch clock to zero.
#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
