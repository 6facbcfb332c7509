//! Top-level facade crate for meterline.
//!
//! Re-exports the core registry and the demo server library so users can depend on a single crate.

pub mod core {
    pub use meterline_core::*;
}

pub mod server {
    pub use meterline_server::*;
}
