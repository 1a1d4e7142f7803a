//! Authentication HTTP Handlers

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tenant_common::{Event, UserRegistered, VerificationStatus};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::error::{AuthError, AuthResult};
use super::hash_token;
use super::middleware::resolve_session;
use super::password::{hash_password, verify_password};
use super::session::{issue_session_token, SESSION_COOKIE};
use crate::api::{ActionResult, AppState};
use crate::config::Environment;
use crate::db::{
    self, create_account, create_session, delete_session, email_exists, find_unit_id_by_number,
    find_user_by_email, list_user_roles, touch_last_login,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registration form.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    /// Checkbox value; "on", "true", "1" and "yes" count as accepted.
    #[serde(default)]
    pub accept_terms: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
}

impl RegisterRequest {
    fn terms_accepted(&self) -> bool {
        matches!(
            self.accept_terms.as_deref(),
            Some("on" | "true" | "1" | "yes")
        )
    }
}

/// Login form.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Query string of the error page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPageQuery {
    pub error: Option<String>,
    pub return_url: Option<String>,
}

/// Profile summary returned by `GET /api/auth/user`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub verification_status: VerificationStatus,
    pub profile_picture_url: Option<String>,
    pub residency_status: Option<String>,
    pub unit_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub profile: Option<ProfileSummary>,
    pub roles: Vec<RoleSummary>,
}

// ============================================================================
// Validation
// ============================================================================

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let rule = if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one number")
    } else {
        None
    };

    match rule {
        Some(message) => Err(ValidationError::new("password_strength").with_message(message.into())),
        None => Ok(()),
    }
}

/// First message among `fields`, in the given order.
fn first_validation_message(errors: &ValidationErrors, fields: &[&str]) -> String {
    let by_field = errors.field_errors();
    fields
        .iter()
        .filter_map(|field| by_field.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "Invalid form data".to_string())
}

fn validate_registration(body: &RegisterRequest) -> Result<(), String> {
    if let Err(errors) = body.validate() {
        let fields = ["email", "password", "first_name", "last_name"];
        if fields.iter().any(|f| errors.field_errors().contains_key(*f)) {
            return Err(first_validation_message(&errors, &fields));
        }
        if !body.terms_accepted() {
            return Err("You must accept the terms and conditions".to_string());
        }
        return Err(first_validation_message(&errors, &["confirm_password"]));
    }
    if !body.terms_accepted() {
        return Err("You must accept the terms and conditions".to_string());
    }
    Ok(())
}

fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new resident.
///
/// Creates the user, a pending profile and the Resident role in one
/// transaction, then emits `user/registered` after the commit. A failure to emit is logged and does not fail the
/// registration.
///
/// POST /register
#[tracing::instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Form(body): Form<RegisterRequest>,
) -> AuthResult<(StatusCode, ActionResult)> {
    if let Err(message) = validate_registration(&body) {
        return Ok((StatusCode::BAD_REQUEST, ActionResult::fail(message)));
    }

    if email_exists(&state.db, &body.email).await? {
        return Ok((
            StatusCode::CONFLICT,
            ActionResult::fail(AuthError::UserAlreadyExists.to_string()),
        ));
    }

    let unit_id = match body.unit_number.as_deref().map(str::trim) {
        Some(number) if !number.is_empty() => match find_unit_id_by_number(&state.db, number).await? {
            Some(id) => Some(id),
            None => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    ActionResult::fail("Unknown unit number"),
                ))
            }
        },
        _ => None,
    };

    let password_hash = hash_password(&body.password).map_err(|_| AuthError::PasswordHash)?;
    let user = match create_account(
        &state.db,
        &body.email,
        &password_hash,
        &body.first_name,
        &body.last_name,
        unit_id,
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Account creation rolled back");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                ActionResult::fail("Registration failed. Please try again."),
            ));
        }
    };

    let event = Event::UserRegistered(UserRegistered {
        user_id: user.id,
        email: user.email.clone(),
        first_name: body.first_name.clone(),
        last_name: body.last_name.clone(),
        unit_id,
        created_at: Utc::now(),
    });
    if let Err(e) = state.events.send(event).await {
        tracing::error!(error = %e, user_id = %user.id, "Failed to trigger verification workflow");
    }

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        ActionResult::ok_with_message(
            "Registration successful! Your account is pending verification.",
        )
        .with_id(user.id),
    ))
}

/// Login with email/password; sets the session cookie.
///
/// POST /login
#[tracing::instrument(skip(state, jar, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(body): Form<LoginRequest>,
) -> AuthResult<Response> {
    if let Err(errors) = body.validate() {
        let message = first_validation_message(&errors, &["email", "password"]);
        return Ok((StatusCode::BAD_REQUEST, ActionResult::fail(message)).into_response());
    }

    let Some(user) = find_user_by_email(&state.db, &body.email).await? else {
        return Ok(invalid_credentials());
    };
    if !verify_password(&body.password, &user.password_hash).map_err(|_| AuthError::PasswordHash)? {
        return Ok(invalid_credentials());
    }

    let issued = issue_session_token(user.id, &state.config.jwt_secret, state.config.session_expiry)?;
    create_session(
        &state.db,
        issued.session_id,
        user.id,
        &hash_token(&issued.token),
        issued.expires_at,
    )
    .await?;
    touch_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let secure = state.config.environment == Environment::Production;
    let jar = jar.add(session_cookie(
        issued.token,
        state.config.session_expiry,
        secure,
    ));

    Ok((jar, ActionResult::ok_with_message("Login successful")).into_response())
}

fn invalid_credentials() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        ActionResult::fail(AuthError::InvalidCredentials.to_string()),
    )
        .into_response()
}

/// Current user, profile and roles.
///
/// GET /api/auth/user
#[tracing::instrument(skip(state, jar))]
pub async fn current_user(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = match resolve_session(&state, &jar).await {
        Ok(session) => session,
        Err(e) if e.is_unauthenticated() => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "user": null, "message": "Not authenticated" })),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Auth API error");
            return internal_error();
        }
    };

    let profile = db::find_profile(&state.db, session.id).await;
    let roles = list_user_roles(&state.db, session.id).await;
    let (Ok(profile), Ok(roles)) = (profile, roles) else {
        return internal_error();
    };

    let user = CurrentUser {
        id: session.id,
        email: session.email,
        profile: profile.map(|p| ProfileSummary {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
            display_name: p.display_name,
            verification_status: p.verification_status,
            profile_picture_url: p.profile_picture_url,
            residency_status: p.residency_status,
            unit_id: p.unit_id,
        }),
        roles: roles
            .into_iter()
            .map(|r| RoleSummary {
                id: r.id,
                name: r.name,
                description: r.description,
            })
            .collect(),
    };

    Json(json!({ "user": user })).into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Delete the session and clear the cookie, then go to the site root.
///
/// POST /api/auth/signout
#[tracing::instrument(skip(state, jar))]
pub async fn signout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Ok(session) = resolve_session(&state, &jar).await {
        if let Err(e) = delete_session(&state.db, session.session_id).await {
            tracing::warn!(error = %e, "Failed to delete session on signout");
        } else {
            tracing::info!(user_id = %session.id, "User signed out");
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let location = format!("{}/", state.config.site_url);

    (StatusCode::FOUND, jar, [(LOCATION, location)]).into_response()
}

/// Error page view.
///
/// GET /error
pub async fn error_page(Query(query): Query<ErrorPageQuery>) -> Json<HashMap<&'static str, String>> {
    Json(HashMap::from([
        (
            "error",
            query
                .error
                .unwrap_or_else(|| "An unexpected error occurred".to_string()),
        ),
        ("returnUrl", query.return_url.unwrap_or_else(|| "/".to_string())),
    ]))
}
