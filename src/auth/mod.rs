pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::User;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password, PasswordHasher};
pub use token::{Claims, TokenService};

lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref SLUG_SEPARATORS: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// Turns a display name into a username: lowercase ASCII, runs of spaces and
/// hyphens collapsed to a single hyphen.
///
/// Non-ASCII characters are dropped, so "Zoë Quinn" becomes "zo-quinn".
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = NON_SLUG_CHARS.replace_all(&lowered, "");
    SLUG_SEPARATORS
        .replace_all(cleaned.trim(), "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

fn validate_fullname(fullname: &str) -> Result<(), ValidationError> {
    if slugify(fullname).is_empty() {
        let mut error = ValidationError::new("fullname");
        error.message = Some("Full name must contain letters or digits".into());
        return Err(error);
    }
    Ok(())
}

/// Payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Payload for a new user registration request.
///
/// The username is not chosen by the client; it is the slug of `fullname`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_fullname")]
    pub fullname: String,
    #[validate(email)]
    pub email: String,
    /// Must be between 8 and 128 characters.
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Must equal `password`; checked by the handler.
    pub repeated_password: String,
}

/// Returned by both registration and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// JWT for the `Authorization: Bearer` header.
    pub token: String,
    pub fullname: String,
    pub email: String,
    pub user_id: i32,
}

impl AuthResponse {
    pub fn new(token: String, user: &User) -> Self {
        Self {
            token,
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            user_id: user.id,
        }
    }
}
