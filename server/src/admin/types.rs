//! Admin module types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::display_name_or_full;

// ============================================================================
// Verify Users
// ============================================================================

/// Pending profile joined with the login address and unit.
#[derive(Debug, Clone, FromRow)]
pub struct PendingProfileRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub unit_number: Option<String>,
    pub floor: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUnit {
    pub unit_number: String,
    pub floor: i32,
}

/// A registration awaiting a decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
    pub phone: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub unit: Option<PendingUnit>,
}

impl From<PendingProfileRow> for PendingProfile {
    fn from(row: PendingProfileRow) -> Self {
        let unit = row
            .unit_number
            .zip(row.floor)
            .map(|(unit_number, floor)| PendingUnit { unit_number, floor });
        Self {
            display_name: display_name_or_full(
                row.display_name.as_deref(),
                row.first_name.as_deref(),
                row.last_name.as_deref(),
            ),
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            move_in_date: row.move_in_date,
            created_at: row.created_at,
            unit,
        }
    }
}

/// Approve form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveForm {
    pub user_id: Option<String>,
    pub notes: Option<String>,
}

/// Reject form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectForm {
    pub user_id: Option<String>,
    pub reason: Option<String>,
}

// ============================================================================
// Floor Captains
// ============================================================================

/// Assignment joined with the captain's login and profile.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub floor_number: i32,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptainAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub floor_number: i32,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
    pub user: Option<AssignmentUser>,
}

impl From<AssignmentRow> for CaptainAssignment {
    fn from(row: AssignmentRow) -> Self {
        let user = row.email.map(|email| AssignmentUser {
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_picture_url: row.profile_picture_url,
        });
        Self {
            id: row.id,
            user_id: row.user_id,
            floor_number: row.floor_number,
            assigned_by: row.assigned_by,
            assigned_at: row.assigned_at,
            user,
        }
    }
}

/// A resident who can be made floor captain.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// `GET /dashboard/admin/floor-captains`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorCaptainsView {
    pub assignments: Vec<CaptainAssignment>,
    pub floors: Vec<i32>,
    pub eligible_users: Vec<EligibleUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignForm {
    pub user_id: Option<String>,
    pub floor_number: Option<String>,
}

impl AssignForm {
    /// The user and floor, or `None` when either is missing or malformed.
    #[must_use]
    pub fn parse(&self) -> Option<(Uuid, i32)> {
        let user_id = self.user_id.as_deref()?.trim().parse().ok()?;
        let floor = self.floor_number.as_deref()?.trim().parse().ok()?;
        Some((user_id, floor))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveForm {
    pub assignment_id: Option<String>,
}
