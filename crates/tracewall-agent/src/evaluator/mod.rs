//! Blocking evaluator adapters.
//!
//! The controller only ever sees `Arc<dyn BlockingEvaluator>`; this module
//! provides the local implementations selected from config.

pub mod rules;

use std::sync::Arc;

use async_trait::async_trait;

use tracewall_core::error::{EvaluationError, Result};
use tracewall_core::{BlockingEvaluator, BlockingResult, CallContext};

use crate::config::BlockingSection;

pub use rules::{BlockRule, RuleEvaluator};

/// Evaluator used when blocking is disabled.
#[derive(Default)]
pub struct AllowAll;

#[async_trait]
impl BlockingEvaluator for AllowAll {
    fn name(&self) -> &'static str {
        "allow_all"
    }

    async fn evaluate(&self, _ctx: &CallContext) -> std::result::Result<BlockingResult, EvaluationError> {
        Ok(BlockingResult::allow())
    }
}

/// Build the evaluator described by the blocking section.
pub fn from_config(cfg: &BlockingSection) -> Result<Arc<dyn BlockingEvaluator>> {
    if !cfg.enabled {
        return Ok(Arc::new(AllowAll));
    }
    Ok(Arc::new(RuleEvaluator::new(&cfg.rules)?))
}
