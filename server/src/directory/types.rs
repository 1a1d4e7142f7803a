//! Directory types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tenant_common::VerificationStatus;
use uuid::Uuid;

use crate::db::display_name_or_full;

/// Query-string filters for the directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryFilters {
    pub search: Option<String>,
    pub floor: Option<i32>,
}

impl DirectoryFilters {
    /// `ILIKE` pattern for the search term, with wildcards in the term escaped.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{escaped}%"))
    }
}

/// Profile joined with its unit and skills.
#[derive(Debug, Clone, FromRow)]
pub struct ResidentRow {
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
    pub created_at: DateTime<Utc>,
    pub email: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub unit_number: Option<String>,
    pub floor: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub community_involvement: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentUnit {
    pub id: Uuid,
    pub unit_number: String,
    pub floor: i32,
}

/// A resident as shown in the directory and on floor pages.
///
/// `email` and `last_active` are withheld for private profiles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentProfile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub verification_status: VerificationStatus,
    pub joined_date: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub profile_picture_url: Option<String>,
    pub occupation: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub residency_status: Option<String>,
    pub languages_spoken: Option<Vec<String>>,
    pub unit: Option<ResidentUnit>,
    pub social_media_links: Option<serde_json::Value>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub community_involvement: Vec<String>,
}

impl From<ResidentRow> for ResidentProfile {
    fn from(row: ResidentRow) -> Self {
        let unit = match (row.unit_id, row.unit_number, row.floor) {
            (Some(id), Some(unit_number), Some(floor)) => Some(ResidentUnit {
                id,
                unit_number,
                floor,
            }),
            _ => None,
        };
        let private = row.profile_visibility == "private";

        Self {
            display_name: display_name_or_full(
                row.display_name.as_deref(),
                row.first_name.as_deref(),
                row.last_name.as_deref(),
            ),
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email.filter(|_| !private),
            verification_status: row.verification_status,
            joined_date: row.created_at,
            last_active: row.last_login.filter(|_| !private),
            bio: row.bio,
            phone: row.phone,
            profile_picture_url: row.profile_picture_url,
            occupation: row.occupation,
            move_in_date: row.move_in_date,
            residency_status: row.residency_status,
            languages_spoken: row.languages_spoken,
            unit,
            social_media_links: row.social_media_links,
            skills: row.skills.unwrap_or_default(),
            interests: row.interests.unwrap_or_default(),
            community_involvement: row.community_involvement.unwrap_or_default(),
        }
    }
}

/// `GET /dashboard/directory`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryView {
    pub residents: Vec<ResidentProfile>,
    pub floors: Vec<i32>,
}
