//! Simulated work: random latency on `/`, random failure on `/error`.
//!
//! Handlers know nothing about metrics; `obs::track_requests` wraps them.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use rand::Rng;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::config::DemoSection;

pub async fn home(State(state): State<AppState>) -> Json<Value> {
    let delay = simulated_delay(&state.cfg().demo);
    tokio::time::sleep(delay).await;

    Json(json!({ "message": "Hello from your monitored app!" }))
}

pub async fn error_page(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if simulated_failure(&state.cfg().demo) {
        tracing::debug!("simulated failure");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Internal Server Error" })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "message": "This page works sometimes." })),
        )
    }
}

fn simulated_delay(demo: &DemoSection) -> Duration {
    let (min, max) = demo.delay_range();
    if min >= max {
        return min;
    }
    rand::rng().random_range(min..=max)
}

fn simulated_failure(demo: &DemoSection) -> bool {
    // error_rate is validated to [0, 1] at load.
    rand::rng().random_bool(demo.error_rate)
}
