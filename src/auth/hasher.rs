//! One-way password hashing and verification (bcrypt).

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Work factor for new hashes. Expensive enough to slow brute force while
/// keeping login latency within bounds.
pub const BCRYPT_COST: u32 = 11;

/// Upper bound on hash/verify operations running at once. bcrypt is
/// CPU-bound; without a bound a login burst would saturate the blocking
/// pool and starve unrelated requests.
const MAX_CONCURRENT_OPS: usize = 4;

/// Salted one-way hashing with constant-time verification.
///
/// Both operations run on the blocking pool behind a semaphore, so the
/// async runtime never stalls on a hash and concurrency stays bounded.
/// Cloning is cheap and shares the permit pool.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    cost: u32,
    permits: Arc<Semaphore>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(BCRYPT_COST)
    }
}

impl CredentialHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_OPS)),
        }
    }

    /// Hash a plaintext password. The salt is random per call, so the same
    /// input yields a different hash every time.
    ///
    /// # Errors
    /// Returns an error on an internal hashing fault, never for any
    /// property of the input itself.
    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("hasher semaphore closed")?;

        let plaintext = plaintext.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .context("hash task aborted")?
            .context("failed to hash password")
    }

    /// Verify a plaintext password against a stored hash, in constant time
    /// with respect to the hash contents.
    ///
    /// A malformed stored hash verifies as `false` rather than erroring;
    /// only genuine internal faults propagate as `Err`.
    pub async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("hasher semaphore closed")?;

        let plaintext = plaintext.to_string();
        let hashed = hashed.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hashed))
            .await
            .context("verify task aborted")?;

        match verified {
            Ok(matched) => Ok(matched),
            Err(err @ (bcrypt::BcryptError::Io(_) | bcrypt::BcryptError::Rand(_))) => {
                Err(err).context("password verification failed")
            }
            Err(err) => {
                debug!("malformed stored hash rejected: {err}");
                Ok(false)
            }
        }
    }
}
