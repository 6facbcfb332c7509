//! Axum router wiring.
//!
//! Demo routes sit behind the request-tracking middleware; `/metrics` and
//! `/healthz` are not instrumented.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops, services};

pub fn build_router(state: AppState) -> Router {
    let demo = Router::new()
        .route("/", get(services::home))
        .route("/error", get(services::error_page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            obs::track_requests,
        ));

    Router::new()
        .merge(demo)
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .with_state(state)
}
