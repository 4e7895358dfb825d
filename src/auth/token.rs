use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i32,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Signs and verifies HS256 access tokens.
///
/// Shared with handlers and [`AuthMiddleware`](super::AuthMiddleware) through
/// `web::Data`.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    /// `None` when the configured hours do not fit a `Duration`.
    lifetime: Option<chrono::Duration>,
}

impl TokenService {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: chrono::Duration::try_hours(lifetime_hours),
        }
    }

    /// Generates a token for `user_id` that expires after the configured lifetime.
    ///
    /// Returns `AppError::InternalServerError` if encoding fails or the lifetime
    /// overflows the clock.
    pub fn generate(&self, user_id: i32) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let expiration = self
            .lifetime
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AppError::InternalServerError("Token lifetime overflow".into()))?;

        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    ///
    /// Returns `AppError::Unauthorized` if the token is malformed, its
    /// signature is invalid, or it has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}
