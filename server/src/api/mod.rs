//! API Router and Application State
//!
//! Central routing configuration and shared state.

mod action;

use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tenant_common::VerificationStatus;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{admin, auth, config::Config, directory, floors, workflow, workflow::EventSender};

pub use action::{ActionError, ActionResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Where handlers send workflow events
    pub events: Arc<dyn EventSender>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: PgPool, config: Config, events: Arc<dyn EventSender>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            events,
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Dashboard views; each handler re-checks its own role family
    let dashboard_routes = Router::new()
        .route("/dashboard", get(dashboard_home))
        .merge(directory::router())
        .merge(floors::router())
        .merge(admin::router());

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(auth::router())
        .merge(workflow::router())
        .merge(dashboard_routes)
        // Page guard sees every request and only acts on protected prefixes
        .layer(from_fn_with_state(state.clone(), auth::page_guard))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether signed event ingest is enabled
    event_ingest: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        event_ingest: state.config.event_key.is_some(),
    })
}

/// Dashboard landing view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    verification_status: Option<VerificationStatus>,
    roles: Vec<String>,
}

/// GET /dashboard
async fn dashboard_home(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<DashboardView>, ActionError> {
    let ctx = auth::require_roles(&state, &jar, &[]).await?;

    Ok(Json(DashboardView {
        user_id: ctx.user.id,
        email: ctx.user.email,
        display_name: ctx.profile.as_ref().map(crate::db::Profile::full_name),
        verification_status: ctx.profile.as_ref().map(|p| p.verification_status),
        roles: ctx.roles,
    }))
}
