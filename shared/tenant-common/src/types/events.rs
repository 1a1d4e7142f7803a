//! Workflow Event Types
//!
//! Every event travels as `{"name": "<event name>", "data": {...}}`. Payload
//! fields are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A named workflow event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Event {
    #[serde(rename = "user/registered")]
    UserRegistered(UserRegistered),
    #[serde(rename = "user/verified")]
    UserVerified(UserVerified),
    #[serde(rename = "user/rejected")]
    UserRejected(UserRejected),
    #[serde(rename = "user/profile.updated")]
    ProfileUpdated(ProfileUpdated),
    #[serde(rename = "user/status.changed")]
    StatusChanged(StatusChanged),

    #[serde(rename = "notification/email.send")]
    EmailSend(EmailSend),
    #[serde(rename = "notification/push.send")]
    PushSend(PushSend),
    #[serde(rename = "notification/digest.generate")]
    DigestGenerate(DigestGenerate),

    #[serde(rename = "event/created")]
    CommunityEventCreated(CommunityEventCreated),
    #[serde(rename = "event/updated")]
    CommunityEventUpdated(CommunityEventUpdated),
    #[serde(rename = "event/reminder")]
    CommunityEventReminder(CommunityEventReminder),
    #[serde(rename = "event/rsvp.changed")]
    RsvpChanged(RsvpChanged),

    #[serde(rename = "maintenance/request.created")]
    MaintenanceCreated(MaintenanceCreated),
    #[serde(rename = "maintenance/request.assigned")]
    MaintenanceAssigned(MaintenanceAssigned),
    #[serde(rename = "maintenance/request.updated")]
    MaintenanceUpdated(MaintenanceUpdated),
    #[serde(rename = "maintenance/request.resolved")]
    MaintenanceResolved(MaintenanceResolved),

    #[serde(rename = "forum/topic.created")]
    ForumTopicCreated(ForumTopicCreated),
    #[serde(rename = "forum/post.created")]
    ForumPostCreated(ForumPostCreated),
    #[serde(rename = "forum/mention")]
    ForumMention(ForumMention),
}

impl Event {
    /// The wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered(_) => "user/registered",
            Self::UserVerified(_) => "user/verified",
            Self::UserRejected(_) => "user/rejected",
            Self::ProfileUpdated(_) => "user/profile.updated",
            Self::StatusChanged(_) => "user/status.changed",
            Self::EmailSend(_) => "notification/email.send",
            Self::PushSend(_) => "notification/push.send",
            Self::DigestGenerate(_) => "notification/digest.generate",
            Self::CommunityEventCreated(_) => "event/created",
            Self::CommunityEventUpdated(_) => "event/updated",
            Self::CommunityEventReminder(_) => "event/reminder",
            Self::RsvpChanged(_) => "event/rsvp.changed",
            Self::MaintenanceCreated(_) => "maintenance/request.created",
            Self::MaintenanceAssigned(_) => "maintenance/request.assigned",
            Self::MaintenanceUpdated(_) => "maintenance/request.updated",
            Self::MaintenanceResolved(_) => "maintenance/request.resolved",
            Self::ForumTopicCreated(_) => "forum/topic.created",
            Self::ForumPostCreated(_) => "forum/post.created",
            Self::ForumMention(_) => "forum/mention",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistered {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVerified {
    pub user_id: Uuid,
    pub verified_by: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRejected {
    pub user_id: Uuid,
    pub rejected_by: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdated {
    pub user_id: Uuid,
    pub updated_fields: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanged {
    pub user_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub timestamp: DateTime<Utc>,
    pub changed_by: Uuid,
}

/// Request to render and deliver one templated email.
///
/// `to` and `template` are optional on the wire so that a malformed request
/// reaches the dispatcher and fails there with a clear message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSend {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSend {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestPeriod {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestGenerate {
    pub user_id: Uuid,
    pub period: DigestPeriod,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEventCreated {
    pub event_id: Uuid,
    pub title: String,
    pub created_by: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEventUpdated {
    pub event_id: Uuid,
    pub updated_by: Uuid,
    pub updated_fields: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEventReminder {
    pub event_id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub attendee_ids: Vec<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpChanged {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RsvpStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceCreated {
    pub request_id: Uuid,
    pub title: String,
    pub reported_by: Uuid,
    pub unit_id: Uuid,
    pub priority: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceAssigned {
    pub request_id: Uuid,
    pub assigned_to: Uuid,
    pub assigned_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceUpdated {
    pub request_id: Uuid,
    pub updated_by: Uuid,
    pub updated_fields: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceResolved {
    pub request_id: Uuid,
    pub resolved_by: Uuid,
    pub resolution_notes: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumTopicCreated {
    pub topic_id: Uuid,
    pub title: String,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostCreated {
    pub post_id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumMention {
    pub post_id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub mentioned_user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}
