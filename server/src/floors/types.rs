//! Floor-captain types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{display_name_or_full, FloorCaptainAssignment};
use crate::directory::ResidentProfile;

/// A floor the caller looks after.
///
/// Admins oversee every floor and get one synthetic assignment per floor with
/// an `admin-floor-N` id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorAssignment {
    pub id: String,
    pub user_id: Uuid,
    pub floor_number: i32,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<Uuid>,
}

impl FloorAssignment {
    #[must_use]
    pub fn admin_virtual(user_id: Uuid, floor_number: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("admin-floor-{floor_number}"),
            user_id,
            floor_number,
            assigned_at: now,
            assigned_by: None,
        }
    }
}

impl From<FloorCaptainAssignment> for FloorAssignment {
    fn from(a: FloorCaptainAssignment) -> Self {
        Self {
            id: a.id.to_string(),
            user_id: a.user_id,
            floor_number: a.floor_number,
            assigned_at: a.assigned_at,
            assigned_by: a.assigned_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorInfo {
    pub floor_number: i32,
    pub unit_count: i64,
    pub resident_count: i64,
}

/// Announcement joined with its author's profile.
#[derive(Debug, Clone, FromRow)]
pub struct AnnouncementRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub author_id: Option<Uuid>,
    pub author_display_name: Option<String>,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementAuthor {
    pub id: Uuid,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<AnnouncementAuthor>,
    pub is_pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<AnnouncementRow> for FloorAnnouncement {
    fn from(row: AnnouncementRow) -> Self {
        let created_by = row.author_id.map(|id| AnnouncementAuthor {
            id,
            display_name: display_name_or_full(
                row.author_display_name.as_deref(),
                row.author_first_name.as_deref(),
                row.author_last_name.as_deref(),
            ),
            first_name: row.author_first_name,
            last_name: row.author_last_name,
        });

        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            created_by,
            is_pinned: row.is_pinned,
            expires_at: row.expires_at,
        }
    }
}

/// `GET /dashboard/floor-captain/floors/{floor}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorView {
    pub info: FloorInfo,
    pub residents: Vec<ResidentProfile>,
    pub announcements: Vec<FloorAnnouncement>,
}

/// Announcement form as posted by the floor page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementForm {
    pub floor_number: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_pinned: Option<String>,
    pub expires_at: Option<String>,
}

/// A validated announcement ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnouncement {
    pub floor_number: i32,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts RFC 3339, a `datetime-local` value or a bare date (UTC midnight).
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl TryFrom<AnnouncementForm> for NewAnnouncement {
    type Error = &'static str;

    fn try_from(form: AnnouncementForm) -> Result<Self, Self::Error> {
        let (Some(floor), Some(title), Some(content)) = (
            non_empty(form.floor_number.as_deref()),
            non_empty(form.title.as_deref()),
            non_empty(form.content.as_deref()),
        ) else {
            return Err("Missing required fields");
        };

        let floor_number = floor.parse::<i32>().map_err(|_| "Invalid floor number")?;
        let expires_at = match non_empty(form.expires_at.as_deref()) {
            Some(raw) => Some(parse_expiry(raw).ok_or("Invalid expiration date")?),
            None => None,
        };

        Ok(Self {
            floor_number,
            title: title.to_string(),
            content: content.to_string(),
            is_pinned: form.is_pinned.as_deref() == Some("true"),
            expires_at,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactForm {
    /// Trimmed subject and message, when both are present.
    #[must_use]
    pub fn parts(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(self.subject.as_deref())?,
            non_empty(self.message.as_deref())?,
        ))
    }
}

/// A floor resident with a deliverable address.
#[derive(Debug, Clone, FromRow)]
pub struct FloorContact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
}

impl FloorContact {
    #[must_use]
    pub fn name(&self) -> String {
        display_name_or_full(
            self.display_name.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn form() -> AnnouncementForm {
        AnnouncementForm {
            floor_number: Some("3".into()),
            title: Some("Laundry room".into()),
            content: Some("Closed Friday".into()),
            is_pinned: None,
            expires_at: None,
        }
    }

    #[test]
    fn announcement_requires_floor_title_and_content() {
        for strip in 0..3 {
            let mut f = form();
            match strip {
                0 => f.floor_number = None,
                1 => f.title = Some("  ".into()),
                _ => f.content = None,
            }
            assert_eq!(NewAnnouncement::try_from(f), Err("Missing required fields"));
        }
    }

    #[test]
    fn pinned_only_when_literally_true() {
        let mut f = form();
        f.is_pinned = Some("true".into());
        assert!(NewAnnouncement::try_from(f).unwrap().is_pinned);

        let mut f = form();
        f.is_pinned = Some("on".into());
        assert!(!NewAnnouncement::try_from(f).unwrap().is_pinned);
    }

    #[test]
    fn expiry_accepts_form_formats() {
        let mut f = form();
        f.expires_at = Some("2025-06-01".into());
        assert_eq!(
            NewAnnouncement::try_from(f).unwrap().expires_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );

        let mut f = form();
        f.expires_at = Some("2025-06-01T18:30".into());
        assert_eq!(
            NewAnnouncement::try_from(f).unwrap().expires_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap())
        );

        let mut f = form();
        f.expires_at = Some("next week".into());
        assert_eq!(NewAnnouncement::try_from(f), Err("Invalid expiration date"));
    }

    #[test]
    fn admin_virtual_assignment_id() {
        let a = FloorAssignment::admin_virtual(Uuid::new_v4(), 7, Utc::now());
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["id"], "admin-floor-7");
        assert_eq!(json["floorNumber"], 7);
        assert!(json["assignedBy"].is_null());
    }

    #[test]
    fn announcement_without_author_has_null_creator() {
        let row = AnnouncementRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            content: "c".into(),
            created_at: Utc::now(),
            is_pinned: true,
            expires_at: None,
            author_id: None,
            author_display_name: None,
            author_first_name: None,
            author_last_name: None,
        };
        let json = serde_json::to_value(FloorAnnouncement::from(row)).unwrap();
        assert!(json["createdBy"].is_null());
        assert_eq!(json["isPinned"], true);
    }

    #[test]
    fn contact_form_needs_both_parts() {
        let form = ContactForm {
            subject: Some("Water".into()),
            message: Some(" ".into()),
        };
        assert!(form.parts().is_none());
    }
}
