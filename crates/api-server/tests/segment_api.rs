//! HTTP-level tests for the segment API, driven through the router.

use audience_api::{router, AppState};
use audience_store::{InMemoryBackend, RequestPolicy, SegmentService};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let service = SegmentService::new(
        Arc::new(InMemoryBackend::with_demo_data()),
        RequestPolicy::default(),
    );
    router(AppState::new(service, "test-node"))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn example_conditions() -> Value {
    json!([
        {"field": "country", "operator": "equals", "value": "US"},
        {"field": "total_spent", "operator": "greater_than", "value": "500", "logic": "AND"}
    ])
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let app = app();

    let (status, fields) = call(&app, Method::GET, "/api/v1/catalog/fields", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fields.as_array().unwrap().len(), 29);
    assert_eq!(fields[0], json!({"key": "email", "label": "Email", "value_type": "string"}));

    let (status, ops) = call(&app, Method::GET, "/api/v1/catalog/operators/event", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ops[2], json!({"key": "performed_count", "label": "Performed Count"}));

    let (status, _) = call(&app, Method::GET, "/api/v1/catalog/operators/currency", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, ops) =
        call(&app, Method::GET, "/api/v1/catalog/fields/favorite_color/operators", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ops.as_array().unwrap().len(), 8);

    let (_, timeframes) = call(&app, Method::GET, "/api/v1/catalog/timeframes", None).await;
    assert_eq!(timeframes[0]["key"], json!("1_hour"));
}

#[tokio::test]
async fn test_preview_then_create() {
    let app = app();

    let (status, preview) = call(
        &app,
        Method::POST,
        "/api/v1/segments/preview",
        Some(json!({"conditions": example_conditions()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let count = preview["count"].as_u64().unwrap();
    assert_eq!(count, 2);

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/v1/segments",
        Some(json!({
            "name": "High-value US",
            "type": "dynamic",
            "criteria": {"conditions": example_conditions()},
            "user_count": count
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], json!("active"));
    assert_eq!(created["user_count"], json!(count));
    assert_eq!(created["criteria"]["conditions"].as_array().unwrap().len(), 2);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = call(&app, Method::GET, &format!("/api/v1/segments/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["criteria"], created["criteria"]);
}

#[tokio::test]
async fn test_validation_errors_are_bad_request() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/segments",
        Some(json!({"name": "", "criteria": {"conditions": example_conditions()}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("validation_failed"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/segments",
        Some(json!({"name": "Empty", "criteria": {"conditions": []}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/segments/preview",
        Some(json!({"conditions": [{"field": "total_spent", "operator": "contains", "value": "5"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not valid for number"));
}

#[tokio::test]
async fn test_update_refresh_delete() {
    let app = app();
    let (_, segments) = call(&app, Method::GET, "/api/v1/segments", None).await;
    let id = segments[0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/segments/{id}");

    let (status, updated) = call(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"status": "inactive", "user_count": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], json!("inactive"));
    assert_eq!(updated["user_count"], json!(0));

    let (status, refreshed) =
        call(&app, Method::POST, &format!("{uri}/refresh"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["user_count"], json!(2));

    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn test_segment_members() {
    let app = app();
    let (_, segments) = call(&app, Method::GET, "/api/v1/segments", None).await;
    let id = segments[0]["id"].as_str().unwrap().to_string();

    let (status, members) =
        call(&app, Method::GET, &format!("/api/v1/segments/{id}/users"), None).await;
    assert_eq!(status, StatusCode::OK);
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m["country"] == json!("US")));
    assert!(members.iter().all(|m| m["id"].is_string()));

    let (status, limited) =
        call(&app, Method::GET, &format!("/api/v1/segments/{id}/users?limit=1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(limited.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/v1/segments/00000000-0000-0000-0000-000000000000/users",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rfm_and_health() {
    let app = app();
    let (status, buckets) = call(&app, Method::GET, "/api/v1/users/rfm-distribution", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(buckets.as_array().unwrap().len(), 7);
    assert_eq!(buckets[0]["label"], json!("Champions"));

    let (status, health) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["backend"], json!("memory"));

    let (status, _) = call(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
