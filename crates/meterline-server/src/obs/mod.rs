//! Request instrumentation for the demo endpoints.
//!
//! The families live in the shared `Registry` held by `AppState`; the
//! `/metrics` handler renders that registry.

pub mod metrics;

pub use metrics::{track_requests, HttpMetrics};
