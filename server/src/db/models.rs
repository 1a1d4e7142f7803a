//! Database Models

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tenant_common::VerificationStatus;
use uuid::Uuid;

/// User model (identity + credentials).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Resident profile, 1:1 with [`User`] (shares its id).
#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub profile_picture_url: Option<String>,
    pub occupation: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub residency_status: Option<String>,
    pub languages_spoken: Option<Vec<String>>,
    pub social_media_links: Option<serde_json::Value>,
    pub unit_id: Option<Uuid>,
    pub profile_visibility: String,
    #[sqlx(try_from = "String")]
    pub verification_status: VerificationStatus,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Display name, falling back to "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        display_name_or_full(
            self.display_name.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        )
    }
}

/// Pick the display name when set, otherwise join first and last name.
#[must_use]
pub fn display_name_or_full(
    display_name: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> String {
    match display_name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""))
            .trim()
            .to_string(),
    }
}

/// Building unit.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub unit_number: String,
    pub floor: i32,
}

/// Named permission bundle.
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: serde_json::Value,
}

/// Floor captain assignment.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorCaptainAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub floor_number: i32,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

/// Session model for session token tracking.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    /// Session ID (the token's `jti`).
    pub id: Uuid,
    /// User this session belongs to.
    pub user_id: Uuid,
    /// SHA256 hash of the session token.
    pub token_hash: String,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_wins_when_present() {
        assert_eq!(
            display_name_or_full(Some("JD"), Some("John"), Some("Doe")),
            "JD"
        );
    }

    #[test]
    fn blank_display_name_falls_back_to_full_name() {
        assert_eq!(
            display_name_or_full(Some("  "), Some("John"), Some("Doe")),
            "John Doe"
        );
        assert_eq!(display_name_or_full(None, Some("John"), None), "John");
        assert_eq!(display_name_or_full(None, None, None), "");
    }
}
