//! TraceWall agent.
//!
//! Wires configuration, the interception controller, blocking evaluators,
//! telemetry sinks and metrics into an axum middleware. Consumed by the
//! demo binary (`main.rs`) and by integration tests.

pub mod config;
pub mod controller;
pub mod evaluator;
pub mod http;
pub mod obs;
pub mod ops;
pub mod router;
pub mod telemetry;

pub use controller::{Controller, Decision, Direction, Guarded, InterceptedCall};
pub use telemetry::{AttributeValue, CallRecord, MemorySink, TelemetrySink, TracingSink};
