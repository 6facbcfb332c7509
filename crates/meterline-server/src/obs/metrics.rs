//! HTTP request metrics.
//!
//! Four families, registered once at startup:
//! - `http_requests_total{method,endpoint,http_status}` counter
//! - `http_requests_inprogress` gauge
//! - `http_request_duration_seconds{endpoint}` histogram
//! - `http_request_summary_seconds{endpoint}` summary

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use meterline_core::error::Result;
use meterline_core::registry::{
    CounterHandle, GaugeHandle, HistogramHandle, Registry, SummaryHandle,
};

use crate::app_state::AppState;

#[derive(Clone)]
pub struct HttpMetrics {
    pub requests_total: CounterHandle,
    pub in_progress: GaugeHandle,
    pub latency: HistogramHandle,
    pub latency_summary: SummaryHandle,
}

impl HttpMetrics {
    pub fn register(registry: &Registry, latency_buckets: &[f64]) -> Result<Self> {
        Ok(Self {
            requests_total: registry.register_counter(
                "http_requests_total",
                "Total number of HTTP requests.",
                &["method", "endpoint", "http_status"],
            )?,
            in_progress: registry.register_gauge(
                "http_requests_inprogress",
                "Number of in-progress HTTP requests.",
            )?,
            latency: registry.register_histogram(
                "http_request_duration_seconds",
                "HTTP request latency in seconds.",
                &["endpoint"],
                latency_buckets,
            )?,
            latency_summary: registry.register_summary(
                "http_request_summary_seconds",
                "HTTP request latency summary in seconds.",
                &["endpoint"],
            )?,
        })
    }

    /// Record one finished request.
    pub fn record(
        &self,
        method: &str,
        endpoint: &str,
        status: u16,
        elapsed: Duration,
    ) -> Result<()> {
        self.latency.with(&[endpoint])?.observe_duration(elapsed);
        self.latency_summary.with(&[endpoint])?.observe_duration(elapsed);
        let status = status.to_string();
        self.requests_total
            .with(&[method, endpoint, status.as_str()])?
            .inc();
        Ok(())
    }
}

/// Middleware: in-progress gauge around the handler, then latency and count.
///
/// Install with `route_layer` so only matched routes are recorded and the
/// `endpoint` label is the route pattern, not the raw path.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let metrics = state.http_metrics();
    let _in_progress = metrics.in_progress.track_inprogress();
    let start = Instant::now();

    let resp = next.run(req).await;

    let status = resp.status().as_u16();
    if let Err(e) = metrics.record(&method, &endpoint, status, start.elapsed()) {
        tracing::warn!(error = %e, %endpoint, "failed to record request metrics");
    }
    tracing::debug!(%method, %endpoint, status, "request recorded");
    resp
}
