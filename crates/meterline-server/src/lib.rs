//! meterline server library entry.
//!
//! Wires the core registry into an axum service: config, shared state, the
//! request-tracking middleware, demo endpoints and the scrape endpoint. Used
//! by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
