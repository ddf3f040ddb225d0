//! Server-tracked sessions: opaque tokens, hashed at rest.
//!
//! The client holds a random token; the store only ever sees its SHA-256
//! hash, keyed to the principal id it was issued for. Expiry is store
//! policy, configured as a TTL.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

/// Create a new session token.
/// The raw value is only returned to hand to the client; stores keep a hash.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never touch the store.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Maps a hashed session token to the principal it was issued for.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, token_hash: &[u8], user_id: Uuid) -> Result<()>;

    /// Resolve a token hash to a principal id; expired or unknown tokens
    /// are `None`, not errors.
    async fn lookup(&self, token_hash: &[u8]) -> Result<Option<Uuid>>;

    /// Remove a session. Idempotent; deleting an unknown token is fine.
    async fn delete(&self, token_hash: &[u8]) -> Result<()>;
}

struct MemoryEntry {
    user_id: Uuid,
    issued_at: Instant,
}

/// In-memory session store for tests and DSN-less development.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Vec<u8>, MemoryEntry>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            u64::try_from(DEFAULT_SESSION_TTL_SECONDS).unwrap_or(0),
        ))
    }
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, token_hash: &[u8], user_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        // Opportunistic purge so expired entries do not accumulate.
        sessions.retain(|_, entry| entry.issued_at.elapsed() < self.ttl);
        sessions.insert(
            token_hash.to_vec(),
            MemoryEntry {
                user_id,
                issued_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn lookup(&self, token_hash: &[u8]) -> Result<Option<Uuid>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token_hash)
            .filter(|entry| entry.issued_at.elapsed() < self.ttl)
            .map(|entry| entry.user_id))
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token_hash);
        Ok(())
    }
}

/// Postgres-backed session store (`user_sessions` in `sql/schema.sql`).
pub struct PgSessionStore {
    pool: PgPool,
    ttl_seconds: i64,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool, ttl_seconds: i64) -> Self {
        Self { pool, ttl_seconds }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, token_hash: &[u8], user_id: Uuid) -> Result<()> {
        // Expired rows are only ever filtered on lookup, so each insert
        // sweeps them out to keep the table bounded.
        let purge = "DELETE FROM user_sessions WHERE expires_at <= NOW()";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = purge
        );
        sqlx::query(purge)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired sessions")?;

        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(self.ttl_seconds)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn lookup(&self, token_hash: &[u8]) -> Result<Option<Uuid>> {
        let query = r"
            SELECT user_id
            FROM user_sessions
            WHERE session_hash = $1
              AND expires_at > NOW()
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| row.get("user_id")))
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }
}
