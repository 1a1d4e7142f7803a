//! Resident Directory
//!
//! Approved residents browse other approved, current residents who have not
//! hidden their profile.

mod handlers;
pub(crate) mod queries;
mod types;

use axum::{routing::get, Router};

use crate::api::AppState;

pub use handlers::ensure_verified;
pub use types::{DirectoryFilters, DirectoryView, ResidentProfile, ResidentRow, ResidentUnit};

/// Directory routes.
///
/// - GET /dashboard/directory - Residents and floors (`?search=&floor=`)
/// - GET /dashboard/directory/residents - Residents only
/// - GET /dashboard/directory/floors - Floors that have listed residents
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/directory", get(handlers::directory_page))
        .route(
            "/dashboard/directory/residents",
            get(handlers::fetch_verified_residents),
        )
        .route(
            "/dashboard/directory/floors",
            get(handlers::fetch_available_floors),
        )
}
