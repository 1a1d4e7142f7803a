//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router, plus
//! utilities for resident creation, role grants and session cookies.
//!
//! `TestApp::lazy()` never touches the database until a query runs, so tests
//! that stop at the guard or the signature check run without `PostgreSQL`.
//! Tests that need the database use `TestApp::new()` and are `#[ignore]`d.
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tenant_common::{Event, RoleName, VerificationStatus};
use tenant_server::api::{create_router, AppState};
use tenant_server::auth::session::{issue_session_token, SESSION_COOKIE};
use tenant_server::auth::{hash_password, hash_token};
use tenant_server::config::Config;
use tenant_server::db;
use tenant_server::workflow::{EventSender, WorkflowError};
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Captured events
// ============================================================================

/// Event sender that keeps everything it is given.
#[derive(Default)]
pub struct CapturedEvents {
    events: Mutex<Vec<Event>>,
}

impl CapturedEvents {
    pub fn all(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSender for CapturedEvents {
    async fn send(&self, event: Event) -> Result<Uuid, WorkflowError> {
        self.events.lock().unwrap().push(event);
        Ok(Uuid::now_v7())
    }
}

// ============================================================================
// Cleanup Guard
// ============================================================================

type CleanupAction = Box<dyn FnOnce(PgPool) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// RAII guard that runs cleanup actions on drop, even if the test panics.
pub struct CleanupGuard {
    pool: PgPool,
    actions: Vec<CleanupAction>,
}

impl CleanupGuard {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            actions: Vec::new(),
        }
    }

    pub fn add<F, Fut>(&mut self, action: F)
    where
        F: FnOnce(PgPool) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.actions.push(Box::new(move |pool| Box::pin(action(pool))));
    }

    /// Delete a user; profiles, roles, sessions and assignments cascade.
    pub fn delete_user(&mut self, user_id: Uuid) {
        self.add(move |pool| async move {
            let _ = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&pool)
                .await;
        });
    }

    pub fn delete_unit(&mut self, unit_id: Uuid) {
        self.add(move |pool| async move {
            let _ = sqlx::query("DELETE FROM units WHERE id = $1")
                .bind(unit_id)
                .execute(&pool)
                .await;
        });
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let actions = std::mem::take(&mut self.actions);
        if actions.is_empty() {
            return;
        }

        let pool = self.pool.clone();
        let handle = tokio::runtime::Handle::current();

        std::thread::spawn(move || {
            handle.block_on(async move {
                for action in actions {
                    action(pool.clone()).await;
                }
            });
        })
        .join()
        .expect("Cleanup thread panicked");
    }
}

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub events: Arc<CapturedEvents>,
}

impl TestApp {
    fn build(pool: PgPool, config: Config) -> Self {
        let events = Arc::new(CapturedEvents::default());
        let state = AppState::new(pool.clone(), config.clone(), events.clone());

        Self {
            router: create_router(state),
            pool,
            config: Arc::new(config),
            events,
        }
    }

    /// App backed by the test database, with migrations applied.
    pub async fn new() -> Self {
        let config = Config::default_for_test();
        let pool = db::create_pool(&config.database_url)
            .await
            .expect("Failed to connect to test DB");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        Self::build(pool, config)
    }

    /// App whose pool connects on first use.
    pub fn lazy() -> Self {
        Self::lazy_with_config(Config::default_for_test())
    }

    pub fn lazy_with_config(config: Config) -> Self {
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("Invalid test database URL");
        Self::build(pool, config)
    }

    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    pub fn cleanup_guard(&self) -> CleanupGuard {
        CleanupGuard::new(self.pool.clone())
    }

    /// `Cookie` header value carrying a fresh session for `user_id`.
    pub async fn session_cookie(&self, user_id: Uuid) -> String {
        let issued = issue_session_token(user_id, &self.config.jwt_secret, 3600)
            .expect("Failed to issue session token");
        db::create_session(
            &self.pool,
            issued.session_id,
            user_id,
            &hash_token(&issued.token),
            issued.expires_at,
        )
        .await
        .expect("Failed to create session");
        format!("{SESSION_COOKIE}={}", issued.token)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Insert a unit with a unique number on `floor`.
pub async fn create_unit(pool: &PgPool, floor: i32) -> Uuid {
    let number = format!("T{}", &Uuid::new_v4().simple().to_string()[..8]);
    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO units (unit_number, floor) VALUES ($1, $2) RETURNING id")
            .bind(number)
            .bind(floor)
            .fetch_one(pool)
            .await
            .expect("Failed to create unit");
    id
}

/// Create a user with a profile in `status`. Returns `(user_id, email)`.
pub async fn create_resident(
    pool: &PgPool,
    status: VerificationStatus,
    unit_id: Option<Uuid>,
) -> (Uuid, String) {
    let email = format!("resident-{}@example.com", Uuid::new_v4().simple());
    let hash = hash_password("correct-horse-battery").expect("Failed to hash password");
    let user = db::create_user(pool, &email, &hash)
        .await
        .expect("Failed to create user");
    db::create_profile(pool, user.id, "Test", "Resident", unit_id)
        .await
        .expect("Failed to create profile");

    sqlx::query(
        "UPDATE user_profiles SET verification_status = $2, residency_status = 'current' WHERE id = $1",
    )
    .bind(user.id)
    .bind(status.as_str())
    .execute(pool)
    .await
    .expect("Failed to set verification status");

    (user.id, email)
}

pub async fn grant_role(pool: &PgPool, user_id: Uuid, role: RoleName) {
    let role = db::find_role_by_name(pool, role.as_str())
        .await
        .expect("Failed to look up role")
        .expect("Role not seeded");
    db::assign_role(pool, user_id, role.id, None)
        .await
        .expect("Failed to assign role");
}

/// Read a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
