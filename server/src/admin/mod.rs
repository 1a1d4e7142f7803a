//! Administration
//!
//! Resident verification and floor-captain management, Admin only.

mod handlers;
mod queries;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::AppState;

/// Admin routes.
///
/// - GET /dashboard/admin/verify-users - Pending registrations
/// - GET /dashboard/admin/verify-users/{user_id} - One pending registration
/// - POST /dashboard/admin/verify-users/approve - Approve (`userId`, `notes`)
/// - POST /dashboard/admin/verify-users/reject - Reject (`userId`, `reason`)
/// - GET /dashboard/admin/floor-captains - Assignments, floors and eligible users
/// - POST /dashboard/admin/floor-captains/assign - Assign (`userId`, `floorNumber`)
/// - POST /dashboard/admin/floor-captains/remove - Remove (`assignmentId`)
pub fn router() -> Router<AppState> {
    let verify_routes = Router::new()
        .route("/verify-users", get(handlers::list_pending_profiles))
        .route("/verify-users/{user_id}", get(handlers::get_pending_profile))
        .route("/verify-users/approve", post(handlers::approve_user))
        .route("/verify-users/reject", post(handlers::reject_user));

    let captain_routes = Router::new()
        .route("/floor-captains", get(handlers::floor_captains_page))
        .route(
            "/floor-captains/assignments",
            get(handlers::fetch_floor_captain_assignments),
        )
        .route("/floor-captains/floors", get(handlers::fetch_available_floors))
        .route(
            "/floor-captains/eligible-users",
            get(handlers::fetch_eligible_users),
        )
        .route("/floor-captains/assign", post(handlers::assign_floor_captain))
        .route(
            "/floor-captains/remove",
            post(handlers::remove_floor_captain_assignment),
        );

    Router::new().nest("/dashboard/admin", verify_routes.merge(captain_routes))
}
