//! Agent config loader (strict parsing).

pub mod schema;

use std::fs;

use tracewall_core::error::{Result, TraceWallError};

pub use schema::{AgentConfig, AttributeNames, BlockingSection, CaptureSection, RuleConfig};

pub fn load_from_file(path: &str) -> Result<AgentConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TraceWallError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AgentConfig> {
    let cfg: AgentConfig = serde_yaml::from_str(s)
        .map_err(|e| TraceWallError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
