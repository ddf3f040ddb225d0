pub mod federated;
pub mod health;
pub mod login;
pub mod register;
pub mod session;

pub use self::federated::{federated_callback, federated_redirect};
pub use self::health::health;
pub use self::login::login;
pub use self::register::register;
pub use self::session::{logout, secrets, session};

// common functions for the handlers
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::users::User;

pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").map_or(false, |re| re.is_match(username))
}

pub fn valid_password(password: &str) -> bool {
    // bcrypt only reads the first 72 bytes; reject anything beyond that
    // instead of silently truncating.
    (8..=72).contains(&password.len())
}

/// Shape of a user in responses; credential material never appears here.
#[derive(Serialize, ToSchema, Debug)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub federated: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            federated: user.is_federated(),
        }
    }
}
