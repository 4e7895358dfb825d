use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account as stored in the database.
///
/// `password_hash` never leaves the server; handlers respond with
/// [`UserSummary`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    /// Slug derived from `fullname`, unique across users.
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
}

/// Public representation of a user, embedded in project and task responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub fullname: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname.clone(),
            email: user.email.clone(),
        }
    }
}
