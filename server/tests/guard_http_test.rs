//! HTTP Integration Tests for the Page Guard and Auth Surface
//!
//! Run with: `cargo test --test guard_http_test -- --nocapture`
//! Database-backed cases: `cargo test --test guard_http_test -- --ignored`

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use helpers::{body_to_json, create_resident, grant_role, location, TestApp};
use serial_test::serial;
use tenant_common::{RoleName, VerificationStatus};

// ============================================================================
// No database
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::lazy();
    let req = TestApp::request(Method::GET, "/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_to_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["event_ingest"], true);
}

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let app = TestApp::lazy();

    for path in [
        "/dashboard",
        "/dashboard/directory",
        "/dashboard/floor-captain/floors/3",
        "/dashboard/admin/verify-users",
    ] {
        let req = TestApp::request(Method::GET, path)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        let expected = format!("/login?returnUrl={}", path.replace('/', "%2F"));
        assert_eq!(location(&resp), Some(expected.as_str()), "{path}");
    }
}

#[tokio::test]
async fn test_garbage_session_cookie_redirects_to_login() {
    let app = TestApp::lazy();
    let req = TestApp::request(Method::GET, "/dashboard/directory")
        .header(header::COOKIE, "session=not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).unwrap().starts_with("/login?returnUrl="));
}

#[tokio::test]
async fn test_current_user_without_session_is_unauthorized() {
    let app = TestApp::lazy();
    let req = TestApp::request(Method::GET, "/api/auth/user")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let json = body_to_json(resp).await;
    assert!(json["user"].is_null());
    assert_eq!(json["message"], "Not authenticated");
}

// ============================================================================
// Database
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
#[ignore]
async fn test_resident_is_sent_to_error_page_for_admin_routes() {
    let app = TestApp::new().await;
    let (user_id, _) = create_resident(&app.pool, VerificationStatus::Approved, None).await;
    grant_role(&app.pool, user_id, RoleName::Resident).await;

    let mut guard = app.cleanup_guard();
    guard.delete_user(user_id);

    let cookie = app.session_cookie(user_id).await;
    let req = TestApp::request(Method::GET, "/dashboard/admin/verify-users")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let to = location(&resp).unwrap();
    assert!(to.starts_with("/error?error="), "{to}");
    assert!(to.ends_with("returnUrl=%2Fdashboard"), "{to}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
#[ignore]
async fn test_dashboard_home_lists_roles() {
    let app = TestApp::new().await;
    let (user_id, email) = create_resident(&app.pool, VerificationStatus::Approved, None).await;
    grant_role(&app.pool, user_id, RoleName::Resident).await;

    let mut guard = app.cleanup_guard();
    guard.delete_user(user_id);

    let cookie = app.session_cookie(user_id).await;
    let req = TestApp::request(Method::GET, "/dashboard")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_to_json(resp).await;
    assert_eq!(json["email"], email);
    assert_eq!(json["verificationStatus"], "approved");
    assert_eq!(json["roles"], serde_json::json!(["Resident"]));
}
