//! In-process metrics, rendered by the `/metrics` handler.

pub mod metrics;

pub use metrics::AgentMetrics;
