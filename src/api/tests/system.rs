use super::*;
use futures::StreamExt;

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _manager, _temp_dir) = create_test_app().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _manager, _temp_dir) = create_test_app().await;

    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/songs/{id}"]["get"].is_object());
}

#[tokio::test]
async fn test_sse_event_stream_content_type() {
    let (app, manager, _temp_dir) = create_test_app().await;
    regular_caller(&manager, "user_a").await;

    let response = app
        .oneshot(get_as("/events", "user_a"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(
        content_type.contains("text/event-stream"),
        "Content-Type should be text/event-stream, got: {}",
        content_type
    );
}

#[tokio::test]
async fn test_sse_event_stream_unknown_user() {
    let (app, _manager, _temp_dir) = create_test_app().await;

    let (status, _) = send(&app, get_as("/events", "nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sse_stream_only_carries_the_callers_events() {
    let (app, manager, _temp_dir) = create_test_app().await;
    regular_caller(&manager, "user_a").await;
    regular_caller(&manager, "user_b").await;

    // The handler subscribes before the response is returned
    let response = app
        .clone()
        .oneshot(get_as("/events", "user_a"))
        .await
        .unwrap();
    let mut stream = response.into_body().into_data_stream();

    let (_, theirs) = send(
        &app,
        post_json_as("/download", "user_b", json!({"url": "test://theirs"})),
    )
    .await;
    let (_, mine) = send(
        &app,
        post_json_as("/download", "user_a", json!({"url": "test://mine"})),
    )
    .await;

    let mut received = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !received.contains("event: completed") {
            let chunk = stream.next().await.unwrap().unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .expect("no completed event for the caller");

    assert!(received.contains(&format!("\"task_id\":{}", mine["task_id"])));
    assert!(!received.contains(&format!("\"task_id\":{}", theirs["task_id"])));
}
