//! End-to-end: demo requests through the router, then a scrape.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use meterline_core::Registry;
use meterline_server::{app_state::AppState, config, router};

fn app(error_rate: f64) -> Router {
    app_with_delay(0, error_rate)
}

fn app_with_delay(delay_ms: u64, error_rate: f64) -> Router {
    let yaml = format!(
        "version: 1\ndemo: {{ min_delay_ms: {delay_ms}, max_delay_ms: {delay_ms}, \
         error_rate: {error_rate} }}\n"
    );
    let cfg = config::load_from_str(&yaml).unwrap();
    router::build_router(AppState::new(cfg).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn scrape_before_traffic_lists_all_families() {
    let app = app(0.0);
    let (status, content_type, body) = get(&app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        content_type.as_deref(),
        Some("text/plain; version=0.0.4; charset=utf-8")
    );
    for line in [
        "# TYPE http_requests_total counter",
        "# TYPE http_requests_inprogress gauge",
        "# TYPE http_request_duration_seconds histogram",
        "# TYPE http_request_summary_seconds summary",
        "http_requests_inprogress 0",
    ] {
        assert!(body.lines().any(|l| l == line), "missing {line:?} in\n{body}");
    }
    assert!(!body.contains("http_requests_total{"));
}

#[tokio::test]
async fn home_request_is_counted_and_timed() {
    let app = app(0.0);
    let (status, _, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Hello from your monitored app!"}"#);

    let (_, _, metrics) = get(&app, "/metrics").await;
    assert!(metrics.contains(
        "http_requests_total{method=\"GET\",endpoint=\"/\",http_status=\"200\"} 1\n"
    ));
    assert!(metrics.contains(
        "http_request_duration_seconds_bucket{endpoint=\"/\",le=\"+Inf\"} 1\n"
    ));
    assert!(metrics.contains("http_request_duration_seconds_count{endpoint=\"/\"} 1\n"));
    assert!(metrics.contains("http_request_summary_seconds_count{endpoint=\"/\"} 1\n"));
    assert!(metrics.contains("http_requests_inprogress 0\n"));
}

#[tokio::test]
async fn inprogress_gauge_counts_requests_in_flight() {
    let app = app_with_delay(300, 0.0);
    let slow = tokio::spawn({
        let app = app.clone();
        async move { get(&app, "/").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_, _, metrics) = get(&app, "/metrics").await;
    assert!(metrics.contains("http_requests_inprogress 1\n"), "{metrics}");

    // Dropping the handler future mid-sleep must release the gauge.
    slow.abort();
    assert!(slow.await.unwrap_err().is_cancelled());

    let (_, _, metrics) = get(&app, "/metrics").await;
    assert!(metrics.contains("http_requests_inprogress 0\n"), "{metrics}");
    assert!(!metrics.contains("http_requests_total{"));
}

#[tokio::test]
async fn error_endpoint_records_failure_status() {
    let app = app(1.0);
    for _ in 0..2 {
        let (status, _, body) = get(&app, "/error").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"message":"Internal Server Error"}"#);
    }

    let (_, _, metrics) = get(&app, "/metrics").await;
    assert!(metrics.contains(
        "http_requests_total{method=\"GET\",endpoint=\"/error\",http_status=\"500\"} 2\n"
    ));
    assert!(!metrics.contains("http_status=\"200\""));
}

#[tokio::test]
async fn error_endpoint_succeeds_when_rate_is_zero() {
    let app = app(0.0);
    let (status, _, body) = get(&app, "/error").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"This page works sometimes."}"#);

    let (_, _, metrics) = get(&app, "/metrics").await;
    assert!(metrics.contains(
        "http_requests_total{method=\"GET\",endpoint=\"/error\",http_status=\"200\"} 1\n"
    ));
}

#[tokio::test]
async fn operational_and_unknown_routes_are_not_recorded() {
    let app = app(0.0);
    assert_eq!(get(&app, "/healthz").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/nope").await.0, StatusCode::NOT_FOUND);
    get(&app, "/metrics").await;

    let (_, _, metrics) = get(&app, "/metrics").await;
    assert!(!metrics.contains("endpoint=\"/healthz\""));
    assert!(!metrics.contains("endpoint=\"/nope\""));
    assert!(!metrics.contains("endpoint=\"/metrics\""));
}

#[tokio::test]
async fn repeated_scrapes_are_identical() {
    let app = app(0.0);
    get(&app, "/").await;
    let (_, _, first) = get(&app, "/metrics").await;
    let (_, _, second) = get(&app, "/metrics").await;
    assert_eq!(first, second);
}

#[test]
fn shared_registry_keeps_existing_families() {
    let registry = Arc::new(Registry::new());
    registry
        .register_counter("jobs_total", "Background jobs.", &["queue"])
        .unwrap();

    let cfg = config::load_from_str("version: 1\n").unwrap();
    let state = AppState::with_registry(cfg, Arc::clone(&registry)).unwrap();
    assert_eq!(state.registry().len(), 5);

    let body = state.render_metrics();
    assert!(body.starts_with("# HELP jobs_total Background jobs.\n"));
}

#[test]
fn conflicting_family_fails_startup() {
    let registry = Arc::new(Registry::new());
    registry
        .register_gauge("http_requests_total", "Wrong kind.")
        .unwrap();

    let cfg = config::load_from_str("version: 1\n").unwrap();
    let err = AppState::with_registry(cfg, registry).err().unwrap();
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");
}
