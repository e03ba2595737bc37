//! Tests for the HTTP API.
//!
//! Refreshes go through the real router and orchestrator; reads come back
//! from the in-memory dashboard cache.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::ApiContext};
use serde_json::{json, Value};

fn server(ctx: &ApiContext) -> TestServer {
    TestServer::new(ctx.router.clone()).expect("Failed to create test server")
}

fn dashboard_path() -> String {
    format!("/dashboard/{}/{}", fixtures::TENANT, fixtures::SEGMENT)
}

/// Reading a slice that was never refreshed is a 404.
#[tokio::test]
async fn test_dashboard_before_refresh_is_not_found() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    let response = server.get(&dashboard_path()).await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(ctx.backend.request_count(), 0, "Reads never query the backend");
}

/// POST /refresh then GET reads back the stored slice.
#[tokio::test]
async fn test_refresh_then_read() {
    let ctx = ApiContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    ctx.activity
        .record_activity(fixtures::SEGMENT, "slack", fixtures::before_t0());
    let server = server(&ctx);

    let response = server
        .post("/refresh")
        .json(&json!({ "tenantId": fixtures::TENANT }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "refreshed");
    assert_eq!(body["slicesWritten"], 9);
    assert_eq!(body["platforms"], json!(["all", "github", "slack"]));
    assert_eq!(body["scope"]["segmentId"], fixtures::SEGMENT);
    assert!(body["watermarkBefore"].is_null());
    assert!(body["runId"].is_string());
    assert_eq!(ctx.cache.entries().len(), 9);

    let response = server
        .get(&dashboard_path())
        .add_query_param("timeframe", "LAST_14_DAYS")
        .add_query_param("platform", "github")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tenantId"], fixtures::TENANT);
    assert_eq!(body["timeframe"], "LAST_14_DAYS");
    assert_eq!(body["platform"], "github");
    assert_eq!(body["data"]["newMembers"]["total"], 3);
    assert_eq!(body["data"]["activity"]["previousPeriodTotal"], 3);
    assert!(body["refreshedAt"].is_string());
}

/// Without query parameters the last 7 days across all platforms are served.
#[tokio::test]
async fn test_dashboard_defaults() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    server
        .post("/refresh")
        .json(&json!({ "tenantId": fixtures::TENANT }))
        .await
        .assert_status_ok();

    let response = server.get(&dashboard_path()).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["timeframe"], "LAST_7_DAYS");
    assert_eq!(body["platform"], "all");
}

/// A second refresh without new activity reports a skip.
#[tokio::test]
async fn test_refresh_skip_is_reported() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    server
        .post("/refresh")
        .json(&json!({ "tenantId": fixtures::TENANT }))
        .await
        .assert_status_ok();

    let response = server
        .post("/refresh")
        .json(&json!({ "tenantId": fixtures::TENANT }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "skipped");
    assert!(body["watermarkAfter"].is_null());
    assert!(body["watermarkBefore"].is_string());
}

#[tokio::test]
async fn test_unsupported_timeframe() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    let response = server
        .get(&dashboard_path())
        .add_query_param("timeframe", "LAST_90_DAYS")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "TIMEFRAME_001");
}

#[tokio::test]
async fn test_refresh_rejects_empty_tenant() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    let response = server
        .post("/refresh")
        .json(&json!({ "tenantId": "" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_refresh_unknown_tenant() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    let response = server
        .post("/refresh")
        .json(&json!({ "tenantId": "tenant-unknown" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "SEGMENT_001");
}

/// A failed pass maps to the cause's status and reports how far it got.
#[tokio::test]
async fn test_refresh_partial_failure() {
    let ctx = ApiContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "slack", fixtures::before_t0());
    ctx.backend.fail_platform(Some("slack"));
    let server = server(&ctx);

    let response = server
        .post("/refresh")
        .json(&json!({ "tenantId": fixtures::TENANT }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "REFRESH_001");
    assert_eq!(body["details"][1], "slices written: 1");
    assert_eq!(ctx.cache.entries().len(), 1);
}

/// /health reports every component; liveness always passes.
#[tokio::test]
async fn test_health_endpoints() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body.get("status").is_some());
    assert!(body.get("clickhouse_connected").is_some());
    assert!(body.get("cube_connected").is_some());
    assert_eq!(body["components"].as_array().map(Vec::len), Some(2));

    server.get("/health/live").await.assert_status_ok();
}

/// Readiness follows ClickHouse alone.
#[tokio::test]
async fn test_readiness_follows_clickhouse() {
    let ctx = ApiContext::new();
    let server = server(&ctx);

    telemetry::health().clickhouse.set_healthy();
    telemetry::health().cube.set_unhealthy("connection refused");
    server.get("/health/ready").await.assert_status_ok();

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["cube_connected"], false);
}
