//! Strategy outcomes and user-facing failure reasons.

use std::fmt;

use crate::users::User;

/// Why an authentication or registration attempt was rejected.
///
/// These are the only messages shown to clients; internal faults never
/// reach this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    IncorrectUsername,
    IncorrectPassword,
    UsernameTaken,
}

impl Reason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::IncorrectUsername => "incorrect username",
            Self::IncorrectPassword => "incorrect password",
            Self::UsernameTaken => "username already taken",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a strategy run: an authenticated user or a rejection.
///
/// The third arm of the contract, an internal fault, is carried as the
/// `Err` of the surrounding `anyhow::Result` so `?` keeps cause detail for
/// operators while callers only ever show clients a generic failure.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(User),
    Failure(Reason),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Success(user) => Some(user),
            Self::Failure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::now_unix;
    use uuid::Uuid;

    #[test]
    fn reason_messages_are_user_facing() {
        assert_eq!(Reason::IncorrectUsername.to_string(), "incorrect username");
        assert_eq!(Reason::IncorrectPassword.to_string(), "incorrect password");
        assert_eq!(Reason::UsernameTaken.to_string(), "username already taken");
    }

    #[test]
    fn into_user_only_on_success() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice1234".to_string(),
            password_hash: None,
            federated_id: None,
            created_at_unix: now_unix(),
            updated_at_unix: now_unix(),
        };
        let id = user.id;

        assert_eq!(
            Outcome::Success(user).into_user().map(|user| user.id),
            Some(id)
        );
        assert!(Outcome::Failure(Reason::IncorrectPassword)
            .into_user()
            .is_none());
    }
}
