//! Blocking contract: evaluator trait, evaluator input, and result value.

use async_trait::async_trait;

use crate::capture::{CaptureSnapshot, CapturedHeader};
use crate::error::{EvaluationError, Result, TraceWallError};

/// Route metadata of an intercepted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    /// Method, upper-cased (e.g. `POST`, or the gRPC method name).
    pub method: String,
    /// Path or fully qualified RPC name.
    pub path: String,
}

impl RouteMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
        }
    }
}

/// Read-only view handed to the evaluator. Built once per call.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub route: RouteMeta,
    pub headers: Vec<CapturedHeader>,
    pub body: String,
    pub body_truncated: bool,
}

impl CallContext {
    pub fn new(route: RouteMeta, snapshot: CaptureSnapshot) -> Self {
        Self {
            route,
            headers: snapshot.headers,
            body: snapshot.body,
            body_truncated: snapshot.truncated,
        }
    }

    /// Joined header value (case-insensitive lookup).
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(CapturedHeader::joined)
    }
}

/// Result of a blocking evaluation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingResult {
    blocked: bool,
    reason: String,
}

impl BlockingResult {
    /// Build from raw parts. A reason on a non-blocking result is rejected.
    pub fn new(blocked: bool, reason: impl Into<String>) -> Result<Self> {
        let reason = reason.into();
        if !blocked && !reason.is_empty() {
            return Err(TraceWallError::BadRequest(
                "blocking result reason must be empty when not blocked".into(),
            ));
        }
        Ok(Self { blocked, reason })
    }

    pub fn allow() -> Self {
        Self {
            blocked: false,
            reason: String::new(),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            blocked: true,
            reason: reason.into(),
        }
    }

    /// Whether execution of the call should be blocked.
    pub fn block_execution(&self) -> bool {
        self.blocked
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Pluggable policy source. Implementations may do blocking I/O; the
/// controller bounds every call with a timeout.
#[async_trait]
pub trait BlockingEvaluator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    async fn evaluate(&self, ctx: &CallContext) -> std::result::Result<BlockingResult, EvaluationError>;
}
