//! Finalized call → attribute list.

use tracewall_core::CaptureSnapshot;

use super::{AttributeValue, CallRecord};
use crate::config::{AttributeNames, CaptureSection};
use crate::controller::{Decision, FinalizedCall};

struct Builder<'a> {
    names: &'a AttributeNames,
    out: Vec<(String, AttributeValue)>,
}

impl Builder<'_> {
    fn str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.out.push((name.into(), AttributeValue::Str(value.into())));
    }

    fn bool(&mut self, name: impl Into<String>, value: bool) {
        self.out.push((name.into(), AttributeValue::Bool(value)));
    }

    fn headers(&mut self, prefix: &str, snap: &CaptureSnapshot) {
        for h in &snap.headers {
            self.str(format!("{prefix}{}", h.name), h.joined());
        }
    }

    fn body(&mut self, key: &str, snap: &CaptureSnapshot) {
        if !snap.body.is_empty() {
            self.str(key, snap.body.clone());
        }
        if snap.truncated {
            self.bool(format!("{key}.truncated"), true);
        }
    }

    fn decision(&mut self, decision: &Decision) {
        let names = self.names;
        match decision {
            Decision::Allowed => self.bool(&names.blocking_result, false),
            Decision::Blocked { reason } => {
                self.bool(&names.blocking_result, true);
                if !reason.is_empty() {
                    self.str(&names.blocking_reason, reason.clone());
                }
            }
            // no boolean result: the evaluator never answered
            Decision::EvaluationFailed { kind, .. } => self.str(&names.evaluation_error, *kind),
        }
    }
}

/// Build the record for a finalized call. Toggles only gate emission; the
/// evaluator always saw the full request capture.
pub fn build_record(names: &AttributeNames, capture: &CaptureSection, call: &FinalizedCall) -> CallRecord {
    let mut b = Builder { names, out: Vec::new() };

    if capture.request_headers {
        b.headers(&names.request_header_prefix, &call.request);
    }
    if capture.request_body {
        b.body(&names.request_body, &call.request);
    }
    if let Some(d) = &call.decision {
        b.decision(d);
    }
    if capture.response_headers {
        b.headers(&names.response_header_prefix, &call.response);
    }
    if capture.response_body {
        b.body(&names.response_body, &call.response);
    }

    CallRecord {
        call_id: call.id,
        method: call.route.method.clone(),
        path: call.route.path.clone(),
        outcome: call.decision.as_ref().map_or("unevaluated", Decision::as_str),
        attributes: b.out,
    }
}
