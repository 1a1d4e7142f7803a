//! Role and Permission Names

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Well-known role names.
///
/// Roles are stored by name in the `roles` table; matching is an exact string
/// comparison against [`RoleName::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    Admin,
    FloorCaptain,
    Resident,
    Alumni,
}

impl RoleName {
    /// The stored role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::FloorCaptain => "FloorCaptain",
            Self::Resident => "Resident",
            Self::Alumni => "Alumni",
        }
    }

    /// All well-known roles.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Admin, Self::FloorCaptain, Self::Resident, Self::Alumni]
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Permission keys found in a role's boolean permission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CanManageUsers,
    CanManageRoles,
    CanManageContent,
    CanVerifyResidents,
    CanPostAnnouncements,
    CanViewContent,
    CanParticipate,
    CanViewLimitedContent,
    CanParticipateLimited,
}

impl Permission {
    /// The key used in the JSON permission map.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::CanManageUsers => "can_manage_users",
            Self::CanManageRoles => "can_manage_roles",
            Self::CanManageContent => "can_manage_content",
            Self::CanVerifyResidents => "can_verify_residents",
            Self::CanPostAnnouncements => "can_post_announcements",
            Self::CanViewContent => "can_view_content",
            Self::CanParticipate => "can_participate",
            Self::CanViewLimitedContent => "can_view_limited_content",
            Self::CanParticipateLimited => "can_participate_limited",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::CanManageUsers,
            Self::CanManageRoles,
            Self::CanManageContent,
            Self::CanVerifyResidents,
            Self::CanPostAnnouncements,
            Self::CanViewContent,
            Self::CanParticipate,
            Self::CanViewLimitedContent,
            Self::CanParticipateLimited,
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|perm| perm.key() == s)
            .ok_or_else(|| Error::UnknownPermission(s.to_string()))
    }
}
