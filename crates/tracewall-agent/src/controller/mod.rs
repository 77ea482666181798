//! Interception controller.
//!
//! Owns the shared pieces of the pipeline (evaluator, re-encoder, sink,
//! metrics) and drives each [`InterceptedCall`] through its phases. Nothing
//! here ever fails the intercepted call: evaluation errors are fail-open and
//! enrichment errors only cost the enrichment.

pub mod call;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracewall_core::error::{EvaluationError, Result};
use tracewall_core::{BlockingEvaluator, Reencoder, RouteMeta, SchemaBridge, SchemaMessage};

use crate::config::{AgentConfig, AttributeNames, CaptureSection};
use crate::evaluator;
use crate::obs::AgentMetrics;
use crate::telemetry::{build_record, CallRecord, TelemetrySink};

pub use call::{CallPhase, Decision, Direction, FinalizedCall, Guarded, InterceptedCall};

pub struct Controller {
    evaluator: Arc<dyn BlockingEvaluator>,
    reencoder: Arc<Reencoder>,
    sink: Arc<dyn TelemetrySink>,
    metrics: Arc<AgentMetrics>,
    capture: CaptureSection,
    names: AttributeNames,
    timeout: Duration,
    status_code: u16,
    seq: AtomicU64,
}

impl Controller {
    pub fn new(cfg: &AgentConfig, evaluator: Arc<dyn BlockingEvaluator>, sink: Arc<dyn TelemetrySink>) -> Self {
        let bridge = Arc::new(SchemaBridge::new());
        Self {
            evaluator,
            reencoder: Arc::new(Reencoder::with_options(bridge, cfg.reencode)),
            sink,
            metrics: Arc::new(AgentMetrics::default()),
            capture: cfg.capture.clone(),
            names: cfg.attributes.clone(),
            timeout: Duration::from_millis(cfg.blocking.timeout_ms),
            status_code: cfg.blocking.status_code,
            seq: AtomicU64::new(0),
        }
    }

    /// Controller with the evaluator described by `cfg.blocking`.
    pub fn from_config(cfg: &AgentConfig, sink: Arc<dyn TelemetrySink>) -> Result<Self> {
        Ok(Self::new(cfg, evaluator::from_config(&cfg.blocking)?, sink))
    }

    /// Share a re-encoder (and its bridge cache) with other controllers.
    pub fn with_reencoder(mut self, reencoder: Arc<Reencoder>) -> Self {
        self.reencoder = reencoder;
        self
    }

    pub fn metrics(&self) -> &Arc<AgentMetrics> {
        &self.metrics
    }

    pub fn reencoder(&self) -> &Arc<Reencoder> {
        &self.reencoder
    }

    pub fn capture(&self) -> &CaptureSection {
        &self.capture
    }

    /// HTTP status used to reject blocked calls.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn start_call(&self, route: RouteMeta) -> InterceptedCall {
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics.calls_started.inc(&[("method", route.method.as_str())]);
        self.metrics.calls_in_flight.inc();
        InterceptedCall::new(id, route, self.capture.max_body_bytes)
    }

    /// Re-encode a schema-typed payload into the target namespace and
    /// capture its JSON text as body. A failed re-encode captures nothing.
    pub fn capture_message<M: SchemaMessage + ?Sized>(&self, call: &mut InterceptedCall, direction: Direction, message: &M) {
        if call.is_finalized() {
            return;
        }
        let text = self.reencoder.reencode_to_text(message);
        if !text.is_empty() {
            call.append_body(direction, text.as_bytes());
        }
    }

    /// Single decision point. Later calls return the recorded decision
    /// without consulting the evaluator again.
    pub async fn evaluate(&self, call: &mut InterceptedCall) -> Decision {
        let Some(ctx) = call.begin_evaluation() else {
            return call.decision().cloned().unwrap_or(Decision::Allowed);
        };

        let evaluator = self.evaluator.name();
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.evaluator.evaluate(&ctx)).await {
            Ok(r) => r,
            Err(_) => Err(EvaluationError::Timeout(self.timeout)),
        };
        self.metrics
            .evaluation_duration
            .observe(&[("evaluator", evaluator)], started.elapsed());

        let decision = Decision::from(result);
        match &decision {
            Decision::Allowed => {}
            Decision::Blocked { reason } => {
                tracing::info!(call_id = call.id(), path = %ctx.route.path, %reason, "call blocked");
            }
            Decision::EvaluationFailed { kind, message } => {
                tracing::warn!(call_id = call.id(), evaluator, kind, error = %message, "evaluation failed; allowing call");
            }
        }
        self.metrics.decisions.inc(&[("outcome", decision.as_str())]);

        call.complete_evaluation(decision.clone());
        decision
    }

    /// Evaluate, then run `f` only when the call is not blocked.
    pub async fn guard<T, F, Fut>(&self, call: &mut InterceptedCall, f: F) -> Guarded<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.evaluate(call).await {
            Decision::Blocked { reason } => Guarded::Skipped { reason },
            _ => Guarded::Ran(f().await),
        }
    }

    /// Emit the call's attributes. Only the first call per call does anything.
    pub fn finalize(&self, call: &mut InterceptedCall) -> Option<CallRecord> {
        let done = call.finalize()?;

        for (direction, snap) in [(Direction::Request, &done.request), (Direction::Response, &done.response)] {
            if snap.truncated {
                self.metrics.capture_truncations.inc(&[("direction", direction.as_str())]);
            }
        }
        self.metrics.calls_in_flight.dec();

        let record = build_record(&self.names, &self.capture, &done);
        self.sink.emit(&record);
        Some(record)
    }
}
