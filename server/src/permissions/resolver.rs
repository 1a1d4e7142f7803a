//! Access resolution.
//!
//! Answers whether a user meets a set of role and permission requirements.

use tenant_common::{Permission, RoleName};

use super::models::{RoleCheckResult, UserWithRoles};

/// Check a user against required roles and permissions.
///
/// Resolution rules:
/// 1. No user: nothing is held, every requirement is missing
/// 2. Empty requirement list: that half of the check passes
/// 3. Otherwise any single held requirement passes (OR semantics)
#[must_use]
pub fn check_user_access(
    user: Option<&UserWithRoles>,
    required_roles: &[RoleName],
    required_permissions: &[Permission],
) -> RoleCheckResult {
    let Some(user) = user else {
        return RoleCheckResult {
            has_role: false,
            has_permission: false,
            missing_roles: required_roles.to_vec(),
            missing_permissions: required_permissions.to_vec(),
        };
    };

    let missing_roles: Vec<RoleName> = required_roles
        .iter()
        .copied()
        .filter(|role| !user.has_role(*role))
        .collect();
    let missing_permissions: Vec<Permission> = required_permissions
        .iter()
        .copied()
        .filter(|perm| !user.has_permission(*perm))
        .collect();

    RoleCheckResult {
        has_role: required_roles.is_empty() || missing_roles.len() < required_roles.len(),
        has_permission: required_permissions.is_empty()
            || missing_permissions.len() < required_permissions.len(),
        missing_roles,
        missing_permissions,
    }
}

/// Human-readable role list: `"A"`, `"A or B"`, `"A, B or C"`.
#[must_use]
pub fn format_role_names(roles: &[RoleName]) -> String {
    match roles {
        [] => String::new(),
        [only] => only.as_str().to_string(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(RoleName::as_str).collect();
            format!("{} or {}", head.join(", "), last.as_str())
        }
    }
}

#[must_use]
pub fn is_admin(user: Option<&UserWithRoles>) -> bool {
    user.is_some_and(|u| u.has_role(RoleName::Admin))
}

#[must_use]
pub fn is_floor_captain(user: Option<&UserWithRoles>) -> bool {
    user.is_some_and(|u| u.has_role(RoleName::FloorCaptain))
}
