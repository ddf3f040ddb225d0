//! Postgres-backed user repository.
//!
//! Uniqueness of `username` (local accounts) and `federated_id` is enforced
//! by the indexes in `sql/schema.sql`; a violated constraint comes back as
//! SQLSTATE 23505 and is mapped to [`RepositoryError::Duplicate`].

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::repository::{RepositoryError, UserRepository};
use super::User;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

const USER_COLUMNS: &str = r"
    id,
    username,
    password_hash,
    federated_id,
    extract(epoch FROM created_at)::bigint AS created_at_unix,
    extract(epoch FROM updated_at)::bigint AS updated_at_unix
";

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        federated_id: row.get("federated_id"),
        created_at_unix: row.get("created_at_unix"),
        updated_at_unix: row.get("updated_at_unix"),
    }
}

async fn fetch_one_by<T>(
    pool: &PgPool,
    column: &str,
    value: T,
) -> Result<Option<User>, RepositoryError>
where
    T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send,
{
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(value)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .with_context(|| format!("failed to lookup user by {column}"))?;

    Ok(row.map(|row| row_to_user(&row)))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        // Local lookups only consider accounts that can hold a password;
        // federated accounts may reuse a display name without shadowing them.
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND federated_id IS NULL LIMIT 1"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by username")?;

        Ok(row.map(|row| row_to_user(&row)))
    }

    async fn find_by_federated_id(
        &self,
        federated_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        fetch_one_by(&self.pool, "federated_id", federated_id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        fetch_one_by(&self.pool, "id", id).await
    }

    async fn create_local(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let query = format!(
            r"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(row_to_user(&row)),
            Err(err) if is_unique_violation(&err) => {
                Err(RepositoryError::duplicate("username", username))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert local user")
                .into()),
        }
    }

    async fn create_federated(
        &self,
        username: &str,
        federated_id: &str,
    ) -> Result<User, RepositoryError> {
        let query = format!(
            r"
            INSERT INTO users (id, username, federated_id)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(federated_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(row_to_user(&row)),
            Err(err) if is_unique_violation(&err) => {
                Err(RepositoryError::duplicate("federated_id", federated_id))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert federated user")
                .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
