//! HTTP Integration Tests for Signed Event Ingest
//!
//! Run with: `cargo test --test workflow_http_test -- --nocapture`

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use helpers::{body_to_json, TestApp};
use serde_json::json;
use tenant_common::Event;
use tenant_server::config::Config;
use tenant_server::workflow::signing::{sign_payload, SIGNATURE_HEADER};
use uuid::Uuid;

fn rejected_event() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "name": "user/rejected",
        "data": {
            "userId": Uuid::new_v4(),
            "rejectedBy": Uuid::new_v4(),
            "timestamp": "2025-05-10T12:00:00Z",
            "reason": "Lease not on file"
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_lists_registered_functions() {
    let app = TestApp::lazy();
    let req = TestApp::request(Method::GET, "/api/workflows")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_to_json(resp).await;
    let functions = json["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 4);
    assert!(functions
        .iter()
        .any(|f| f["trigger"] == "notification/email.send"));
}

#[tokio::test]
async fn test_signed_event_is_accepted() {
    let app = TestApp::lazy();
    let body = rejected_event();
    let signature = sign_payload(app.config.event_key.as_deref().unwrap(), &body);

    let req = TestApp::request(Method::POST, "/api/workflows")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let json = body_to_json(resp).await;
    assert_eq!(json["status"], 202);
    assert_eq!(json["ids"].as_array().unwrap().len(), 1);

    let events = app.events.all();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::UserRejected(e) if e.reason.as_deref() == Some("Lease not on file")));
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let app = TestApp::lazy();
    let body = rejected_event();
    let signature = sign_payload(app.config.event_key.as_deref().unwrap(), &body);

    let mut tampered = body.clone();
    tampered.extend_from_slice(b" ");

    let req = TestApp::request(Method::POST, "/api/workflows")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(tampered))
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(resp).await["error"], "INVALID_SIGNATURE");
    assert!(app.events.all().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let app = TestApp::lazy();
    let req = TestApp::request(Method::POST, "/api/workflows")
        .body(Body::from(rejected_event()))
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ingest_without_event_key_is_unavailable() {
    let mut config = Config::default_for_test();
    config.event_key = None;
    let app = TestApp::lazy_with_config(config);

    let req = TestApp::request(Method::POST, "/api/workflows")
        .header(SIGNATURE_HEADER, "sha256=00")
        .body(Body::from(rejected_event()))
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_to_json(resp).await["error"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn test_signed_unknown_event_is_bad_request() {
    let app = TestApp::lazy();
    let body = serde_json::to_vec(&json!({ "name": "user/deleted", "data": {} })).unwrap();
    let signature = sign_payload(app.config.event_key.as_deref().unwrap(), &body);

    let req = TestApp::request(Method::POST, "/api/workflows")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
