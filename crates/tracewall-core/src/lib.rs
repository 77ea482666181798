//! tracewall core: schema re-encoding, call capture, and the blocking contract.
//!
//! This crate defines the data model shared by the agent and any host adapter:
//! cross-namespace protobuf re-encoding, per-call capture buffers, and the
//! evaluator/result types of the blocking decision. It carries no transport or
//! runtime dependencies so it can be embedded in any host process.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Enrichment runs inside somebody else's request path, so every fallible step
//! surfaces as `TraceWallError`/`Result` instead of unwinding into the host.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod blocking;
pub mod capture;
pub mod error;
pub mod schema;

/// Shared result type.
pub use error::{EvaluationError, Result, TraceWallError};

pub use blocking::{BlockingEvaluator, BlockingResult, CallContext, RouteMeta};
pub use capture::{CaptureBuffer, CaptureSnapshot};
pub use schema::{GenericMessage, RawMessage, Reencoder, SchemaBridge, SchemaMessage, SourceFile};
