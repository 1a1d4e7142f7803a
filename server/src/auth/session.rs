//! Session Token Generation and Validation
//!
//! Session tokens are HS256 JWTs carried in the `session` cookie. The `jti`
//! claim is the id of the matching row in `sessions`, so a token stops working
//! as soon as that row is deleted.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AuthError, AuthResult};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// JWT claims for session tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as UUID string).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Session ID.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> AuthResult<Uuid> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }

    pub fn session_id(&self) -> AuthResult<Uuid> {
        self.jti.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// A freshly issued session token.
#[derive(Debug)]
pub struct SessionToken {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issue a session token for a user.
///
/// # Arguments
/// * `user_id` - The user's UUID
/// * `secret` - HS256 signing secret
/// * `expiry_seconds` - Token validity (typically 604800 = 7 days)
pub fn issue_session_token(
    user_id: Uuid,
    secret: &str,
    expiry_seconds: i64,
) -> AuthResult<SessionToken> {
    let now = Utc::now();
    let session_id = Uuid::now_v7();
    let expires_at = now + Duration::seconds(expiry_seconds);

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
        jti: session_id.to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(SessionToken {
        token,
        session_id,
        expires_at,
    })
}

/// Validate and decode a session token.
pub fn validate_session_token(token: &str, secret: &str) -> AuthResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
