//! Permission system types.

use std::collections::HashMap;

use serde::Serialize;
use tenant_common::{Permission, RoleName};
use uuid::Uuid;

/// A role assigned to a user, with its permission map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleWithPermissions {
    pub id: Uuid,
    pub name: String,
    pub permissions: HashMap<String, bool>,
}

impl RoleWithPermissions {
    /// Whether the map sets `permission` to `true`.
    #[must_use]
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions
            .get(permission.key())
            .copied()
            .unwrap_or(false)
    }
}

/// A user together with every role they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithRoles {
    pub id: Uuid,
    pub roles: Vec<RoleWithPermissions>,
}

impl UserWithRoles {
    /// Exact name match against the assigned roles.
    #[must_use]
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.iter().any(|r| r.name == role.as_str())
    }

    /// True iff any assigned role grants the permission.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.roles.iter().any(|r| r.grants(permission))
    }

    #[must_use]
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

/// Outcome of [`check_user_access`](super::check_user_access).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheckResult {
    pub has_role: bool,
    pub has_permission: bool,
    pub missing_roles: Vec<RoleName>,
    pub missing_permissions: Vec<Permission>,
}

impl RoleCheckResult {
    /// Both the role and the permission requirement are met.
    #[must_use]
    pub const fn granted(&self) -> bool {
        self.has_role && self.has_permission
    }
}
