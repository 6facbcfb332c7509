//! meterline core: metric registry, instruments and text exposition.
//!
//! This crate carries no transport or runtime dependencies. The server crate
//! wires it into HTTP; tests build as many independent registries as they
//! need.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Fallible paths
//! surface as `MeterlineError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod registry;

/// Shared result type.
pub use error::{ErrorCode, MeterlineError, Result};
pub use registry::Registry;
