//! Demo endpoints that give the metrics something to measure.

pub mod demo;

pub use demo::{error_page, home};
