//! In-handler role guard.
//!
//! The page middleware already checked the route family; handlers re-resolve
//! the session and re-check their own role set before touching data.

use axum_extra::extract::CookieJar;
use tenant_common::RoleName;
use tracing::{debug, error};

use super::middleware::{resolve_session, SessionUser};
use crate::api::{ActionError, AppState};
use crate::db::{find_profile, Profile};
use crate::permissions::{
    check_user_access, format_role_names, get_user_roles, is_admin, UserWithRoles,
};

/// Role family for the resident directory.
pub const DIRECTORY_ROLES: &[RoleName] = &[RoleName::Resident, RoleName::Admin, RoleName::FloorCaptain];

/// Role family for floor-captain tooling.
pub const FLOOR_CAPTAIN_ROLES: &[RoleName] = &[RoleName::FloorCaptain, RoleName::Admin];

/// Role family for administration.
pub const ADMIN_ROLES: &[RoleName] = &[RoleName::Admin];

/// What a guarded handler knows about its caller.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: SessionUser,
    pub profile: Option<Profile>,
    pub roles: Vec<String>,
    pub access: Option<UserWithRoles>,
}

impl AuthContext {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        is_admin(self.access.as_ref())
    }
}

/// Require a session holding at least one of `required` (any session when empty).
#[tracing::instrument(skip(state, jar))]
pub async fn require_roles(
    state: &AppState,
    jar: &CookieJar,
    required: &[RoleName],
) -> Result<AuthContext, ActionError> {
    let user = resolve_session(state, jar).await.map_err(|e| {
        if !e.is_unauthenticated() {
            error!(error = %e, "Session resolution failed");
        }
        ActionError::NotAuthenticated
    })?;

    let access = get_user_roles(&state.db, user.id).await;

    if !required.is_empty() {
        let check = check_user_access(access.as_ref(), required, &[]);
        if !check.has_role {
            debug!(user_id = %user.id, required = %format_role_names(required), "Action access denied");
            let missing: Vec<&str> = check.missing_roles.iter().map(RoleName::as_str).collect();
            return Err(ActionError::AccessDenied(missing.join(", ")));
        }
    }

    let profile = find_profile(&state.db, user.id)
        .await
        .map_err(|_| ActionError::Failed("Failed to load profile"))?;

    Ok(AuthContext {
        roles: access
            .as_ref()
            .map(UserWithRoles::role_names)
            .unwrap_or_default(),
        user,
        profile,
        access,
    })
}
