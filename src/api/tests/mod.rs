use super::*;
use crate::manager::test_helpers::{FakeFetcher, create_test_manager_with, regular_caller};
use crate::types::Caller;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

mod system;

pub(super) const TEST_SECRET: &str = "test-secret";
pub(super) const WEBHOOK_SECRET: &str = "hook-secret";

/// Router over a fresh manager with test mode and the webhook enabled
async fn create_test_app() -> (Router, Arc<TaskManager>, TempDir) {
    create_test_app_with(|_| {}).await
}

async fn create_test_app_with(
    configure: impl FnOnce(&mut Config),
) -> (Router, Arc<TaskManager>, TempDir) {
    let (manager, _fetcher, temp_dir) = create_test_manager_with(FakeFetcher::default(), |c| {
        c.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
        c.server.api.auth.test_mode_secret = Some(TEST_SECRET.to_string());
        c.server.api.auth.webhook_secret = Some(WEBHOOK_SECRET.to_string());
        configure(c);
    })
    .await;

    let config = manager.get_config();
    let manager = Arc::new(manager);
    let app = create_router(manager.clone(), config);
    (app, manager, temp_dir)
}

fn get_as(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-User-Id", user)
        .body(Body::empty())
        .unwrap()
}

fn post_json_as(uri: &str, user: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-User-Id", user)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_as(uri: &str, user: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("X-User-Id", user)
        .header("Content-Type", content_type)
        .body(body.into())
        .unwrap()
}

/// Send a request and decode the JSON body (`Value::Null` when empty or not JSON)
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (_app, manager, _temp_dir) = create_test_app().await;
    let config = manager.get_config();

    let api_handle = tokio::spawn({
        let manager = manager.clone();
        async move { start_api_server(manager, config).await }
    });

    // Give it a moment to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");

    api_handle.abort();
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (_app, manager, _temp_dir) = create_test_app().await;

    let api_handle = manager.spawn_api_server();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _manager, _temp_dir) = create_test_app_with(|c| {
        c.server.api.cors_enabled = true;
        c.server.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (app, _manager, _temp_dir) = create_test_app_with(|c| {
        c.server.api.cors_enabled = true;
        c.server.api.cors_origins = vec!["https://app.example".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://app.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example"
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (app, _manager, _temp_dir) = create_test_app_with(|c| {
        c.server.api.cors_enabled = false;
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_public_routes_need_no_identity() {
    let (app, _manager, _temp_dir) = create_test_app().await;

    for uri in ["/health", "/openapi.json"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_caller_routes_require_identity() {
    let (app, _manager, _temp_dir) = create_test_app().await;

    for (method, uri) in [
        ("POST", "/download"),
        ("GET", "/download"),
        ("GET", "/songs"),
        ("GET", "/songs/1"),
        ("GET", "/events"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"]["code"], "unauthorized");
    }
}

#[tokio::test]
async fn test_api_key_guards_caller_routes() {
    let (app, manager, _temp_dir) = create_test_app_with(|c| {
        c.server.api.auth.api_key = Some("shared-key".to_string());
    })
    .await;
    regular_caller(&manager, "user_a").await;

    let (status, _) = send(&app, get_as("/download", "user_a")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/download")
        .header("X-User-Id", "user_a")
        .header("X-Api-Key", "shared-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    // Health stays public
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (app, _manager, _temp_dir) = create_test_app_with(|c| {
        c.server.api.swagger_ui = true;
    })
    .await;
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "tunefetch REST API");

    let (app, _manager, _temp_dir) = create_test_app_with(|c| {
        c.server.api.swagger_ui = false;
    })
    .await;
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_identity_provider() {
    struct Fixed;

    impl auth::IdentityProvider for Fixed {
        fn identify(&self, _headers: &axum::http::HeaderMap) -> Result<Caller> {
            Ok(Caller::test("always-me"))
        }
    }

    let (_app, manager, _temp_dir) = create_test_app().await;
    let app = create_router_with_identity(manager.clone(), manager.get_config(), Arc::new(Fixed));

    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"url": "test://anything"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");
    assert!(
        manager
            .db
            .find_user_by_external_id("always-me")
            .await
            .unwrap()
            .is_some()
    );
}
