//! Session Resolution and Page Guard

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tenant_common::RoleName;
use tracing::{debug, error};
use url::form_urlencoded;
use uuid::Uuid;

use super::error::{AuthError, AuthResult};
use super::hash_token;
use super::session::{validate_session_token, SESSION_COOKIE};
use crate::api::AppState;
use crate::db::{find_active_session, find_user_by_id};
use crate::permissions::{check_user_access, format_role_names, get_user_roles};

/// Message shown on the error page when a role check fails.
pub const PERMISSION_DENIED_REASON: &str = "You don't have permission to access this page";

/// Protected page prefixes and the roles each requires (empty: any session).
pub const PROTECTED_ROUTES: &[(&str, &[RoleName])] = &[
    ("/dashboard", &[]),
    ("/dashboard/admin", &[RoleName::Admin]),
    (
        "/dashboard/floor-captain",
        &[RoleName::Admin, RoleName::FloorCaptain],
    ),
    (
        "/dashboard/directory",
        &[RoleName::Admin, RoleName::FloorCaptain, RoleName::Resident],
    ),
];

const PUBLIC_PATHS: &[&str] = &["/", "/login", "/register", "/error", "/health", "/api/workflows"];
const PUBLIC_PREFIXES: &[&str] = &["/api/auth", "/api/public"];

/// Authenticated user resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub session_id: Uuid,
}

/// Whether `path` equals `prefix` or continues it at a segment boundary.
fn matches_segment_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Paths that never require a session.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
        || PUBLIC_PREFIXES
            .iter()
            .any(|prefix| matches_segment_prefix(path, prefix))
}

/// Roles required for `path`, by longest matching protected prefix.
///
/// `None` means the path is not protected. `/dashboard/administrator` does not
/// match `/dashboard/admin`; it falls back to `/dashboard`.
#[must_use]
pub fn required_roles(path: &str) -> Option<&'static [RoleName]> {
    PROTECTED_ROUTES
        .iter()
        .filter(|(prefix, _)| matches_segment_prefix(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, roles)| *roles)
}

/// `/login?returnUrl=<path>`
#[must_use]
pub fn login_redirect_url(return_path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("returnUrl", return_path)
        .finish();
    format!("/login?{query}")
}

/// `/error?error=<reason>&returnUrl=/dashboard`
#[must_use]
pub fn error_redirect_url(reason: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("error", reason)
        .append_pair("returnUrl", "/dashboard")
        .finish();
    format!("/error?{query}")
}

/// Resolve the session cookie to a user.
///
/// Valid iff the token verifies, its session row exists and is unexpired, and
/// the row's hash matches the presented token.
pub async fn resolve_session(state: &AppState, jar: &CookieJar) -> AuthResult<SessionUser> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::NotAuthenticated)?;

    let claims = validate_session_token(&token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;
    let session_id = claims.session_id()?;

    let session = find_active_session(&state.db, session_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if session.user_id != user_id || session.token_hash != hash_token(&token) {
        return Err(AuthError::InvalidToken);
    }

    let user = find_user_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(SessionUser {
        id: user.id,
        email: user.email,
        session_id,
    })
}

/// Page middleware enforcing [`PROTECTED_ROUTES`].
///
/// No session redirects to the login page with a `returnUrl`; a failed role
/// check redirects to the error page.
pub async fn page_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public_path(&path) {
        return next.run(request).await;
    }
    let Some(roles) = required_roles(&path) else {
        return next.run(request).await;
    };

    let user = match resolve_session(&state, &jar).await {
        Ok(user) => user,
        Err(e) => {
            if !e.is_unauthenticated() {
                error!(error = %e, path = %path, "Session resolution failed");
            }
            return Redirect::to(&login_redirect_url(&path)).into_response();
        }
    };

    if !roles.is_empty() {
        let user_roles = get_user_roles(&state.db, user.id).await;
        let check = check_user_access(user_roles.as_ref(), roles, &[]);
        if !check.granted() {
            debug!(
                user_id = %user.id,
                path = %path,
                required = %format_role_names(roles),
                "Page access denied"
            );
            return Redirect::to(&error_redirect_url(PERMISSION_DENIED_REASON)).into_response();
        }
    }

    next.run(request).await
}
