//! Floor-Captain Tooling
//!
//! Captains see and act on the floors they are assigned; admins on every floor.

mod handlers;
mod queries;
mod types;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::AppState;

pub use handlers::floor_message_events;
pub use queries::all_unit_floors;
pub use types::{
    AnnouncementForm, ContactForm, FloorAnnouncement, FloorAssignment, FloorInfo, FloorView,
    NewAnnouncement,
};

/// Floor-captain routes.
///
/// - GET /dashboard/floor-captain - Floors the caller looks after
/// - GET /dashboard/floor-captain/floors/{floor} - Info, residents and announcements
/// - GET /dashboard/floor-captain/floors/{floor}/info
/// - GET /dashboard/floor-captain/floors/{floor}/residents
/// - GET /dashboard/floor-captain/floors/{floor}/announcements
/// - POST /dashboard/floor-captain/floors/{floor}/contact - Email every resident
/// - POST /dashboard/floor-captain/announcements - Post an announcement
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/floor-captain", get(handlers::fetch_assigned_floors))
        .route(
            "/dashboard/floor-captain/announcements",
            post(handlers::create_floor_announcement),
        )
        .route(
            "/dashboard/floor-captain/floors/{floor}",
            get(handlers::floor_page),
        )
        .route(
            "/dashboard/floor-captain/floors/{floor}/info",
            get(handlers::fetch_floor_info),
        )
        .route(
            "/dashboard/floor-captain/floors/{floor}/residents",
            get(handlers::fetch_floor_residents),
        )
        .route(
            "/dashboard/floor-captain/floors/{floor}/announcements",
            get(handlers::fetch_floor_announcements),
        )
        .route(
            "/dashboard/floor-captain/floors/{floor}/contact",
            post(handlers::contact_floor_residents),
        )
}
