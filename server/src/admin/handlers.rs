//! Admin handlers.
//!
//! Verification decisions are not written here: approving or rejecting sends
//! a `user/verified` or `user/rejected` event and the workflow runtime applies
//! the transition and notifies the resident.

use axum::extract::{Path, State};
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tenant_common::{Event, UserRejected, UserVerified};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::queries;
use super::types::{
    ApproveForm, AssignForm, CaptainAssignment, EligibleUser, FloorCaptainsView, PendingProfile,
    RejectForm, RemoveForm,
};
use crate::api::{ActionError, ActionResult, AppState};
use crate::auth::{require_roles, AuthContext, ADMIN_ROLES};
use crate::floors::all_unit_floors;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the deciding admin, mapping guard failures to form errors.
async fn decider(
    state: &AppState,
    jar: &CookieJar,
    verb: &str,
) -> Result<AuthContext, ActionResult> {
    require_roles(state, jar, ADMIN_ROLES)
        .await
        .map_err(|e| match e {
            ActionError::NotAuthenticated => {
                ActionResult::fail(format!("You must be logged in to {verb} users"))
            }
            other => ActionResult::fail(other.to_string()),
        })
}

fn parse_user_id(raw: Option<&str>) -> Result<Uuid, ActionResult> {
    let raw = non_empty(raw).ok_or_else(|| ActionResult::fail("User ID is required"))?;
    raw.parse()
        .map_err(|_| ActionResult::fail("Invalid user ID"))
}

// ============================================================================
// Verify Users
// ============================================================================

/// GET /dashboard/admin/verify-users
pub async fn list_pending_profiles(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<PendingProfile>>, ActionError> {
    require_roles(&state, &jar, ADMIN_ROLES).await?;

    let rows = queries::pending_profiles(&state.db)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch pending profiles"))?;
    Ok(Json(rows.into_iter().map(PendingProfile::from).collect()))
}

/// GET /dashboard/admin/verify-users/{user_id}
///
/// Target of the verification link in the admin notification email.
pub async fn get_pending_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PendingProfile>, ActionError> {
    require_roles(&state, &jar, ADMIN_ROLES).await?;

    let row = queries::pending_profile(&state.db, user_id)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch pending profile"))?
        .ok_or(ActionError::NotFound("No pending registration for this user"))?;
    Ok(Json(PendingProfile::from(row)))
}

/// POST /dashboard/admin/verify-users/approve
#[instrument(skip(state, jar, form))]
pub async fn approve_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ApproveForm>,
) -> ActionResult {
    let user_id = match parse_user_id(form.user_id.as_deref()) {
        Ok(id) => id,
        Err(result) => return result,
    };
    let ctx = match decider(&state, &jar, "approve").await {
        Ok(ctx) => ctx,
        Err(result) => return result,
    };

    let event = Event::UserVerified(UserVerified {
        user_id,
        verified_by: ctx.user.id,
        timestamp: Utc::now(),
        notes: non_empty(form.notes.as_deref()).map(String::from),
    });

    match state.events.send(event).await {
        Ok(event_id) => {
            info!(%user_id, verified_by = %ctx.user.id, %event_id, "User approval requested");
            ActionResult::ok_with_message("User approved successfully")
        }
        Err(e) => {
            error!(%user_id, error = %e, "Failed to send approval event");
            ActionResult::fail("Failed to approve user")
        }
    }
}

/// POST /dashboard/admin/verify-users/reject
#[instrument(skip(state, jar, form))]
pub async fn reject_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RejectForm>,
) -> ActionResult {
    let user_id = match parse_user_id(form.user_id.as_deref()) {
        Ok(id) => id,
        Err(result) => return result,
    };
    let ctx = match decider(&state, &jar, "reject").await {
        Ok(ctx) => ctx,
        Err(result) => return result,
    };

    let event = Event::UserRejected(UserRejected {
        user_id,
        rejected_by: ctx.user.id,
        timestamp: Utc::now(),
        reason: non_empty(form.reason.as_deref()).map(String::from),
    });

    match state.events.send(event).await {
        Ok(event_id) => {
            info!(%user_id, rejected_by = %ctx.user.id, %event_id, "User rejection requested");
            ActionResult::ok_with_message("User rejected successfully")
        }
        Err(e) => {
            error!(%user_id, error = %e, "Failed to send rejection event");
            ActionResult::fail("Failed to reject user")
        }
    }
}

// ============================================================================
// Floor Captains
// ============================================================================

async fn assignments(state: &AppState) -> Result<Vec<CaptainAssignment>, ActionError> {
    let rows = queries::captain_assignments(&state.db)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch floor captain assignments"))?;
    Ok(rows.into_iter().map(CaptainAssignment::from).collect())
}

async fn floors(state: &AppState) -> Result<Vec<i32>, ActionError> {
    all_unit_floors(&state.db)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch floors"))
}

async fn eligible(state: &AppState) -> Result<Vec<EligibleUser>, ActionError> {
    queries::eligible_users(&state.db)
        .await
        .map_err(|_| ActionError::Failed("Failed to fetch eligible users"))
}

/// GET /dashboard/admin/floor-captains
pub async fn floor_captains_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<FloorCaptainsView>, ActionError> {
    require_roles(&state, &jar, ADMIN_ROLES).await?;

    Ok(Json(FloorCaptainsView {
        assignments: assignments(&state).await?,
        floors: floors(&state).await?,
        eligible_users: eligible(&state).await?,
    }))
}

/// GET /dashboard/admin/floor-captains/assignments
pub async fn fetch_floor_captain_assignments(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<CaptainAssignment>>, ActionError> {
    require_roles(&state, &jar, ADMIN_ROLES).await?;
    assignments(&state).await.map(Json)
}

/// GET /dashboard/admin/floor-captains/floors
pub async fn fetch_available_floors(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<i32>>, ActionError> {
    require_roles(&state, &jar, ADMIN_ROLES).await?;
    floors(&state).await.map(Json)
}

/// GET /dashboard/admin/floor-captains/eligible-users
pub async fn fetch_eligible_users(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<EligibleUser>>, ActionError> {
    require_roles(&state, &jar, ADMIN_ROLES).await?;
    eligible(&state).await.map(Json)
}

/// POST /dashboard/admin/floor-captains/assign
#[instrument(skip(state, jar, form))]
pub async fn assign_floor_captain(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AssignForm>,
) -> Result<ActionResult, ActionError> {
    let ctx = require_roles(&state, &jar, ADMIN_ROLES).await?;

    let Some((user_id, floor)) = form.parse() else {
        return Ok(ActionResult::fail("User ID and floor number are required"));
    };

    match queries::find_assignment(&state.db, user_id, floor).await {
        Ok(Some(existing)) => {
            return Ok(ActionResult::ok_with_message(
                "User is already assigned as floor captain for this floor",
            )
            .with_id(existing));
        }
        Ok(None) => {}
        Err(_) => return Ok(ActionResult::fail("Failed to assign floor captain")),
    }

    match queries::create_assignment(&state.db, user_id, floor, ctx.user.id).await {
        Ok(id) => {
            info!(assignment_id = %id, %user_id, floor, assigned_by = %ctx.user.id, "Floor captain assigned");
            Ok(ActionResult::ok_with_message("Floor captain assigned").with_id(id))
        }
        Err(_) => Ok(ActionResult::fail("Failed to assign floor captain")),
    }
}

/// POST /dashboard/admin/floor-captains/remove
#[instrument(skip(state, jar, form))]
pub async fn remove_floor_captain_assignment(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RemoveForm>,
) -> Result<ActionResult, ActionError> {
    let ctx = require_roles(&state, &jar, ADMIN_ROLES).await?;

    let Some(id) = non_empty(form.assignment_id.as_deref()).and_then(|raw| raw.parse::<Uuid>().ok())
    else {
        return Ok(ActionResult::fail("Assignment ID is required"));
    };

    match queries::delete_assignment(&state.db, id).await {
        Ok(true) => {
            info!(assignment_id = %id, removed_by = %ctx.user.id, "Floor captain assignment removed");
            Ok(ActionResult::ok_with_message("Floor captain assignment removed"))
        }
        Ok(false) => Ok(ActionResult::fail("Floor captain assignment not found")),
        Err(_) => Ok(ActionResult::fail("Failed to remove floor captain assignment")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::Config;
    use crate::workflow::testing::RecordingSender;

    fn state(sender: &Arc<RecordingSender>) -> AppState {
        let config = Config::default_for_test();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        AppState::new(db, config, sender.clone())
    }

    #[tokio::test]
    async fn approve_without_user_id_dispatches_nothing() {
        let sender = Arc::new(RecordingSender::default());
        let result = approve_user(
            State(state(&sender)),
            CookieJar::new(),
            Form(ApproveForm::default()),
        )
        .await;

        assert_eq!(result, ActionResult::fail("User ID is required"));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn reject_without_user_id_dispatches_nothing() {
        let sender = Arc::new(RecordingSender::default());
        let form = RejectForm {
            user_id: Some("   ".into()),
            reason: Some("Not a resident".into()),
        };
        let result = reject_user(State(state(&sender)), CookieJar::new(), Form(form)).await;

        assert_eq!(result, ActionResult::fail("User ID is required"));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn decisions_need_a_session() {
        let sender = Arc::new(RecordingSender::default());
        let user_id = Some(Uuid::new_v4().to_string());

        let approve = approve_user(
            State(state(&sender)),
            CookieJar::new(),
            Form(ApproveForm {
                user_id: user_id.clone(),
                notes: None,
            }),
        )
        .await;
        assert_eq!(
            approve,
            ActionResult::fail("You must be logged in to approve users")
        );

        let reject = reject_user(
            State(state(&sender)),
            CookieJar::new(),
            Form(RejectForm {
                user_id,
                reason: None,
            }),
        )
        .await;
        assert_eq!(
            reject,
            ActionResult::fail("You must be logged in to reject users")
        );
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn malformed_user_id_is_reported() {
        assert_eq!(
            parse_user_id(Some("abc")),
            Err(ActionResult::fail("Invalid user ID"))
        );
    }
}
