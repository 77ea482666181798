//! Per-call interception state.
//!
//! `Started → Capturing → Evaluating → {Allowed | Blocked} → Finalized`.
//! Evaluation errors are fail-open and land in `Allowed` with the error kept
//! in the decision. Capture calls after `Finalized` are ignored.

use tracewall_core::error::EvaluationError;
use tracewall_core::{BlockingResult, CallContext, CaptureBuffer, CaptureSnapshot, RouteMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Started,
    Capturing,
    Evaluating,
    Allowed,
    Blocked,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

/// Outcome of the blocking decision for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked { reason: String },
    EvaluationFailed { kind: &'static str, message: String },
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Blocked { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::Blocked { .. } => "blocked",
            Decision::EvaluationFailed { .. } => "evaluation_error",
        }
    }
}

impl From<Result<BlockingResult, EvaluationError>> for Decision {
    fn from(r: Result<BlockingResult, EvaluationError>) -> Self {
        match r {
            Ok(res) if res.block_execution() => Decision::Blocked {
                reason: res.reason().to_string(),
            },
            Ok(_) => Decision::Allowed,
            Err(e) => Decision::EvaluationFailed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// Result of running business logic behind the decision point.
#[derive(Debug, PartialEq, Eq)]
pub enum Guarded<T> {
    Ran(T),
    Skipped { reason: String },
}

/// Everything captured for a call, released at finalization.
#[derive(Debug, Clone)]
pub struct FinalizedCall {
    pub id: u64,
    pub route: RouteMeta,
    pub request: CaptureSnapshot,
    pub response: CaptureSnapshot,
    pub decision: Option<Decision>,
}

/// Per-call state. Owned by exactly one in-flight call.
#[derive(Debug)]
pub struct InterceptedCall {
    id: u64,
    route: RouteMeta,
    phase: CallPhase,
    request: CaptureBuffer,
    response: CaptureBuffer,
    decision: Option<Decision>,
}

impl InterceptedCall {
    pub(crate) fn new(id: u64, route: RouteMeta, max_body_bytes: usize) -> Self {
        Self {
            id,
            route,
            phase: CallPhase::Started,
            request: CaptureBuffer::new(max_body_bytes),
            response: CaptureBuffer::new(max_body_bytes),
            decision: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn route(&self) -> &RouteMeta {
        &self.route
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == CallPhase::Finalized
    }

    pub fn add_header(&mut self, direction: Direction, name: &str, value: &str) {
        if let Some(buf) = self.buffer_mut(direction) {
            buf.add_header(name, value);
        }
    }

    pub fn append_body(&mut self, direction: Direction, chunk: &[u8]) {
        if let Some(buf) = self.buffer_mut(direction) {
            buf.append_body(chunk);
        }
    }

    fn buffer_mut(&mut self, direction: Direction) -> Option<&mut CaptureBuffer> {
        match self.phase {
            CallPhase::Finalized => return None,
            CallPhase::Started => self.phase = CallPhase::Capturing,
            _ => {}
        }
        Some(match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        })
    }

    /// Enter the decision point. Yields the evaluator input exactly once.
    pub fn begin_evaluation(&mut self) -> Option<CallContext> {
        match self.phase {
            CallPhase::Started | CallPhase::Capturing => {
                self.phase = CallPhase::Evaluating;
                Some(CallContext::new(self.route.clone(), self.request.snapshot()))
            }
            _ => None,
        }
    }

    /// Record the decision taken for the context handed out by `begin_evaluation`.
    pub fn complete_evaluation(&mut self, decision: Decision) {
        if self.phase != CallPhase::Evaluating {
            return;
        }
        self.phase = if decision.is_blocked() {
            CallPhase::Blocked
        } else {
            CallPhase::Allowed
        };
        self.decision = Some(decision);
    }

    /// Freeze the call. Returns `None` when already finalized.
    pub fn finalize(&mut self) -> Option<FinalizedCall> {
        if self.phase == CallPhase::Finalized {
            return None;
        }
        self.phase = CallPhase::Finalized;
        Some(FinalizedCall {
            id: self.id,
            route: self.route.clone(),
            request: self.request.snapshot(),
            response: self.response.snapshot(),
            decision: self.decision.clone(),
        })
    }
}
