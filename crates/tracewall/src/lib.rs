//! Top-level facade crate for tracewall.
//!
//! Re-exports the core primitives and the agent library so users can depend on a single crate.

pub mod core {
    pub use tracewall_core::*;
}

pub mod agent {
    pub use tracewall_agent::*;
}
