//! Static blocking rules compiled from config.
//!
//! Supports simple wildcard matching: routes ending in `*` match by prefix,
//! header rules accept `name:*` for "header present with any value".

use async_trait::async_trait;

use tracewall_core::error::{EvaluationError, Result, TraceWallError};
use tracewall_core::{BlockingEvaluator, BlockingResult, CallContext};

use crate::config::RuleConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RouteMatch {
    Exact(String),
    Prefix(String),
}

#[derive(Debug, Clone)]
struct HeaderMatch {
    name: String,
    value: Option<String>, // None => any value
}

/// Compiled blocking rule. All present conditions must hold.
#[derive(Debug, Clone)]
pub struct BlockRule {
    pub id: String,
    reason: String,
    method: Option<String>,
    route: Option<RouteMatch>,
    header: Option<HeaderMatch>,
    body_contains: Option<String>,
}

impl BlockRule {
    fn matches(&self, ctx: &CallContext) -> bool {
        if let Some(m) = &self.method {
            if !ctx.route.method.eq_ignore_ascii_case(m) {
                return false;
            }
        }
        match &self.route {
            Some(RouteMatch::Exact(p)) if ctx.route.path != *p => return false,
            Some(RouteMatch::Prefix(p)) if !ctx.route.path.starts_with(p.as_str()) => return false,
            _ => {}
        }
        if let Some(h) = &self.header {
            match (ctx.header(&h.name), &h.value) {
                (None, _) => return false,
                (Some(v), Some(want)) if v != *want => return false,
                _ => {}
            }
        }
        if let Some(needle) = &self.body_contains {
            if !ctx.body.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

pub fn compile_rules(raw: &[RuleConfig]) -> Result<Vec<BlockRule>> {
    let mut out = Vec::with_capacity(raw.len());
    for r in raw {
        if r.id.trim().is_empty() {
            return Err(TraceWallError::BadRequest("blocking rule id must not be empty".into()));
        }
        if r.reason.trim().is_empty() {
            return Err(TraceWallError::BadRequest(format!("blocking rule {}: reason must not be empty", r.id)));
        }
        if r.method.is_none() && r.route.is_none() && r.header.is_none() && r.body_contains.is_none() {
            return Err(TraceWallError::BadRequest(format!(
                "blocking rule {}: at least one of method/route/header/body_contains is required",
                r.id
            )));
        }

        let route = r.route.as_deref().map(|p| match p.strip_suffix('*') {
            Some(prefix) => RouteMatch::Prefix(prefix.to_string()),
            None => RouteMatch::Exact(p.to_string()),
        });

        let header = match r.header.as_deref() {
            None => None,
            Some(s) => {
                // format: "name:value" or "name:*"
                let (name, value) = s.split_once(':').ok_or_else(|| {
                    TraceWallError::BadRequest(format!(
                        "blocking rule {}: invalid header matcher {s} (expected name:value)",
                        r.id
                    ))
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(TraceWallError::BadRequest(format!(
                        "blocking rule {}: header name must not be empty",
                        r.id
                    )));
                }
                let value = value.trim();
                Some(HeaderMatch {
                    name: name.to_ascii_lowercase(),
                    value: if value == "*" { None } else { Some(value.to_string()) },
                })
            }
        };

        out.push(BlockRule {
            id: r.id.clone(),
            reason: r.reason.clone(),
            method: r.method.as_ref().map(|m| m.to_ascii_uppercase()),
            route,
            header,
            body_contains: r.body_contains.clone(),
        });
    }
    Ok(out)
}

/// Local evaluator: first matching rule blocks.
pub struct RuleEvaluator {
    rules: Vec<BlockRule>,
}

impl RuleEvaluator {
    pub fn new(raw: &[RuleConfig]) -> Result<Self> {
        Ok(Self { rules: compile_rules(raw)? })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn first_match(&self, ctx: &CallContext) -> Option<&BlockRule> {
        self.rules.iter().find(|r| r.matches(ctx))
    }
}

#[async_trait]
impl BlockingEvaluator for RuleEvaluator {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn evaluate(&self, ctx: &CallContext) -> std::result::Result<BlockingResult, EvaluationError> {
        Ok(match self.first_match(ctx) {
            Some(rule) => {
                tracing::debug!(rule = %rule.id, path = %ctx.route.path, "blocking rule matched");
                BlockingResult::block(rule.reason.clone())
            }
            None => BlockingResult::allow(),
        })
    }
}
