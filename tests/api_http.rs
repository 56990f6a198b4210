// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /forecast (body shape, stub values, default forecast_time)
// - validation failures -> 400 with error JSON
// - x-request-id correlation header

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use market_forecast_gateway::forecast::StubEngine;
use market_forecast_gateway::{router, AppState};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_router() -> Router {
    router(AppState::new(Arc::new(StubEngine)))
}

async fn post_json(app: &Router, body: Body) -> (StatusCode, axum::http::HeaderMap, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/forecast")
        .header("content-type", "application/json")
        .body(body)
        .expect("build POST /forecast");
    let resp = app.clone().oneshot(req).await.expect("oneshot /forecast");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, headers, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_status() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("health json");
    assert_eq!(v, json!({ "status": "ok" }));
}

#[tokio::test]
async fn api_forecast_returns_stub_contract() {
    let app = test_router();
    let payload = json!({ "market_id": "X", "forecast_time": "2024-01-01T00:00:00Z" });

    let (status, _, v) = post_json(&app, Body::from(payload.to_string())).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(v["market_id"], "X");
    assert_eq!(v["probability"], 0.5);
    assert_eq!(v["confidence_interval"]["lower_bound"], 0.3);
    assert_eq!(v["confidence_interval"]["upper_bound"], 0.7);
    let ft = v["forecast_time"].as_str().expect("forecast_time string");
    assert_eq!(
        chrono::DateTime::parse_from_rfc3339(ft).unwrap(),
        chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap()
    );
}

#[tokio::test]
async fn api_forecast_defaults_time_to_now() {
    let app = test_router();
    let before = chrono::Utc::now();

    let (status, _, v) = post_json(&app, Body::from(r#"{"market_id":"NOW-1"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let ft = chrono::DateTime::parse_from_rfc3339(v["forecast_time"].as_str().unwrap()).unwrap();
    assert!(ft >= before, "default forecast_time should be 'now'");
}

#[tokio::test]
async fn api_forecast_rejects_bad_input_with_400() {
    let app = test_router();

    let cases = [
        r#"{"market_id":""}"#,
        r#"{"market_id":"   "}"#,
        r#"{"forecast_time":"2024-01-01T00:00:00Z"}"#,
        r#"{"market_id":"X","forecast_time":"next tuesday"}"#,
        r#"{"market_id":"X","forecast_time":12345}"#,
        r#"{"market_id": "X""#,
        "not json at all",
    ];

    for body in cases {
        let (status, _, v) = post_json(&app, Body::from(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(v["error"], "validation_error", "body: {body}");
        assert!(v["message"].as_str().is_some_and(|m| !m.is_empty()));
        assert!(v["request_id"].is_string(), "error body carries request id");
    }
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = test_router();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = resp
            .headers()
            .get("x-request-id")
            .expect("x-request-id header")
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(id.len(), 36, "uuid v4 string");
        ids.push(id);
    }
    assert_ne!(ids[0], ids[1], "ids are unique per request");
}

#[tokio::test]
async fn error_body_request_id_matches_header() {
    let app = test_router();
    let (status, headers, v) = post_json(&app, Body::from(r#"{"market_id":""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let hdr = headers.get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(v["request_id"], hdr);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = test_router();
    let resp = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
