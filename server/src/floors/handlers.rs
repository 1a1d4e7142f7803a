//! Floor-captain handlers.

use axum::extract::{Path, State};
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tenant_common::{EmailSend, Event};
use tracing::{error, info, instrument};

use super::queries;
use super::types::{
    AnnouncementForm, ContactForm, FloorAnnouncement, FloorAssignment, FloorContact, FloorInfo,
    FloorView, NewAnnouncement,
};
use crate::api::{ActionError, ActionResult, AppState};
use crate::auth::{require_roles, AuthContext, FLOOR_CAPTAIN_ROLES};
use crate::directory::ResidentProfile;
use crate::permissions::can_manage_floor;

const NOT_ASSIGNED: &str = "You are not assigned to this floor";
const FLOOR_MESSAGE_TEMPLATE: &str = "floor-message";

async fn may_manage(state: &AppState, ctx: &AuthContext, floor: i32) -> Result<bool, ActionError> {
    let Some(access) = ctx.access.as_ref() else {
        return Ok(false);
    };
    can_manage_floor(&state.db, access, floor)
        .await
        .map_err(|_| ActionError::Failed("Failed to check floor access"))
}

/// Guard plus floor check for read actions.
async fn floor_caller(
    state: &AppState,
    jar: &CookieJar,
    floor: i32,
) -> Result<AuthContext, ActionError> {
    let ctx = require_roles(state, jar, FLOOR_CAPTAIN_ROLES).await?;
    if !may_manage(state, &ctx, floor).await? {
        return Err(ActionError::Forbidden(NOT_ASSIGNED));
    }
    Ok(ctx)
}

async fn info(state: &AppState, floor: i32) -> Result<FloorInfo, ActionError> {
    queries::floor_info(&state.db, floor)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch floor information"))
}

async fn residents(state: &AppState, floor: i32) -> Result<Vec<ResidentProfile>, ActionError> {
    let rows = queries::floor_residents(&state.db, floor)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch floor residents"))?;
    Ok(rows.into_iter().map(ResidentProfile::from).collect())
}

async fn announcements(
    state: &AppState,
    floor: i32,
) -> Result<Vec<FloorAnnouncement>, ActionError> {
    let rows = queries::floor_announcements(&state.db, floor)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch floor announcements"))?;
    Ok(rows.into_iter().map(FloorAnnouncement::from).collect())
}

/// GET /dashboard/floor-captain
pub async fn fetch_assigned_floors(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<FloorAssignment>>, ActionError> {
    let ctx = require_roles(&state, &jar, FLOOR_CAPTAIN_ROLES).await?;
    let failed = |_: sqlx::Error| ActionError::Failed("Failed to fetch assigned floors");

    let assignments: Vec<FloorAssignment> = if ctx.is_admin() {
        let now = Utc::now();
        queries::all_unit_floors(&state.db)
            .await
            .map_err(failed)?
            .into_iter()
            .map(|floor| FloorAssignment::admin_virtual(ctx.user.id, floor, now))
            .collect()
    } else {
        queries::captain_assignments(&state.db, ctx.user.id)
            .await
            .map_err(failed)?
            .into_iter()
            .map(FloorAssignment::from)
            .collect()
    };

    Ok(Json(assignments))
}

/// GET /dashboard/floor-captain/floors/{floor}
pub async fn floor_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(floor): Path<i32>,
) -> Result<Json<FloorView>, ActionError> {
    floor_caller(&state, &jar, floor).await?;

    Ok(Json(FloorView {
        info: info(&state, floor).await?,
        residents: residents(&state, floor).await?,
        announcements: announcements(&state, floor).await?,
    }))
}

/// GET /dashboard/floor-captain/floors/{floor}/info
pub async fn fetch_floor_info(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(floor): Path<i32>,
) -> Result<Json<FloorInfo>, ActionError> {
    floor_caller(&state, &jar, floor).await?;
    info(&state, floor).await.map(Json)
}

/// GET /dashboard/floor-captain/floors/{floor}/residents
pub async fn fetch_floor_residents(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(floor): Path<i32>,
) -> Result<Json<Vec<ResidentProfile>>, ActionError> {
    floor_caller(&state, &jar, floor).await?;
    residents(&state, floor).await.map(Json)
}

/// GET /dashboard/floor-captain/floors/{floor}/announcements
pub async fn fetch_floor_announcements(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(floor): Path<i32>,
) -> Result<Json<Vec<FloorAnnouncement>>, ActionError> {
    floor_caller(&state, &jar, floor).await?;
    announcements(&state, floor).await.map(Json)
}

/// POST /dashboard/floor-captain/announcements
#[instrument(skip(state, jar, form))]
pub async fn create_floor_announcement(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AnnouncementForm>,
) -> Result<ActionResult, ActionError> {
    let ctx = require_roles(&state, &jar, FLOOR_CAPTAIN_ROLES).await?;

    let announcement = match NewAnnouncement::try_from(form) {
        Ok(a) => a,
        Err(message) => return Ok(ActionResult::fail(message)),
    };

    if !may_manage(&state, &ctx, announcement.floor_number).await? {
        return Ok(ActionResult::fail(NOT_ASSIGNED));
    }

    match queries::insert_announcement(&state.db, ctx.user.id, &announcement).await {
        Ok(id) => {
            info!(
                announcement_id = %id,
                floor = announcement.floor_number,
                author = %ctx.user.id,
                "Floor announcement created"
            );
            Ok(ActionResult::ok_with_message("Announcement created").with_id(id))
        }
        Err(_) => Ok(ActionResult::fail("Failed to create announcement")),
    }
}

/// One `floor-message` email event per contact.
pub fn floor_message_events(
    floor: i32,
    subject: &str,
    message: &str,
    captain_name: &str,
    contacts: &[FloorContact],
) -> Vec<Event> {
    let timestamp = Utc::now();
    contacts
        .iter()
        .map(|contact| {
            let data = json!({
                "recipientName": contact.name(),
                "floorNumber": floor,
                "subject": subject,
                "message": message,
                "captainName": captain_name,
            });
            let template_data = match data {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            Event::EmailSend(EmailSend {
                to: Some(contact.email.clone()),
                subject: subject.to_string(),
                template: Some(FLOOR_MESSAGE_TEMPLATE.to_string()),
                template_data,
                timestamp,
            })
        })
        .collect()
}

/// POST /dashboard/floor-captain/floors/{floor}/contact
#[instrument(skip(state, jar, form))]
pub async fn contact_floor_residents(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(floor): Path<i32>,
    Form(form): Form<ContactForm>,
) -> Result<ActionResult, ActionError> {
    let ctx = require_roles(&state, &jar, FLOOR_CAPTAIN_ROLES).await?;

    let Some((subject, message)) = form.parts() else {
        return Ok(ActionResult::fail("Subject and message are required"));
    };

    if !may_manage(&state, &ctx, floor).await? {
        return Ok(ActionResult::fail(NOT_ASSIGNED));
    }

    let Ok(contacts) = queries::floor_contacts(&state.db, floor).await else {
        return Ok(ActionResult::fail("Failed to contact floor residents"));
    };

    let captain_name = ctx
        .profile
        .as_ref()
        .map_or_else(|| "Your floor captain".to_string(), |p| p.full_name());

    let events = floor_message_events(floor, subject, message, &captain_name, &contacts);
    let total = events.len();
    for event in events {
        if let Err(e) = state.events.send(event).await {
            error!(floor, error = %e, "Failed to queue floor message");
            return Ok(ActionResult::fail("Failed to contact floor residents"));
        }
    }

    info!(floor, recipients = total, sender = %ctx.user.id, "Floor message queued");
    Ok(ActionResult::ok_with_message(format!(
        "Message sent to {total} residents"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(email: &str, first: &str) -> FloorContact {
        FloorContact {
            email: email.into(),
            first_name: Some(first.into()),
            last_name: Some("Resident".into()),
            display_name: None,
        }
    }

    #[test]
    fn one_floor_message_per_contact() {
        let contacts = [contact("a@example.com", "Ann"), contact("b@example.com", "Ben")];
        let events = floor_message_events(4, "Water", "Off at noon", "Cap", &contacts);
        assert_eq!(events.len(), 2);

        let Event::EmailSend(first) = &events[0] else {
            panic!("expected an email event");
        };
        assert_eq!(first.to.as_deref(), Some("a@example.com"));
        assert_eq!(first.template.as_deref(), Some("floor-message"));
        assert_eq!(first.template_data["recipientName"], "Ann Resident");
        assert_eq!(first.template_data["floorNumber"], 4);
        assert_eq!(first.template_data["captainName"], "Cap");
    }

    #[test]
    fn empty_floor_yields_no_events() {
        assert!(floor_message_events(2, "s", "m", "c", &[]).is_empty());
    }
}
