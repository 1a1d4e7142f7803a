//! Authentication Service
//!
//! Handles local registration and login, cookie sessions, the page guard and
//! the in-handler role guard.

mod error;
mod guard;
mod handlers;
mod middleware;
mod password;
pub mod session;

use axum::{
    routing::{get, post},
    Router,
};
use sha2::{Digest, Sha256};

use crate::api::AppState;

pub use error::{AuthError, AuthResult, ErrorResponse};
pub use guard::{require_roles, AuthContext, ADMIN_ROLES, DIRECTORY_ROLES, FLOOR_CAPTAIN_ROLES};
pub use middleware::{
    error_redirect_url, is_public_path, login_redirect_url, page_guard, required_roles,
    resolve_session, SessionUser, PERMISSION_DENIED_REASON, PROTECTED_ROUTES,
};
pub use password::{hash_password, verify_password};

/// Hex-encoded SHA-256 of a session token, as stored in `sessions`.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create authentication router.
///
/// Public routes:
/// - POST /register - Register a new resident
/// - POST /login - Login with email/password
/// - GET /error - Error page view
/// - GET /api/auth/user - Current user (401 without a session)
/// - POST /api/auth/signout - Invalidate session
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/error", get(handlers::error_page))
        .route("/api/auth/user", get(handlers::current_user))
        .route("/api/auth/signout", post(handlers::signout))
}
