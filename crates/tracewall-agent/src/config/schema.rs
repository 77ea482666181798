use serde::Deserialize;
use tracewall_core::error::{Result, TraceWallError};
use tracewall_core::schema::ReencodeOptions;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub version: u32,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub capture: CaptureSection,

    #[serde(default)]
    pub blocking: BlockingSection,

    #[serde(default)]
    pub attributes: AttributeNames,

    #[serde(default)]
    pub reencode: ReencodeOptions,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TraceWallError::UnsupportedVersion);
        }

        self.capture.validate()?;
        self.blocking.validate()?;
        self.attributes.validate()?;

        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: 1,
            service: ServiceSection::default(),
            capture: CaptureSection::default(),
            blocking: BlockingSection::default(),
            attributes: AttributeNames::default(),
            reencode: ReencodeOptions::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

const MAX_BODY_CAP: usize = 16 * 1024 * 1024;
const MAX_REQUEST_CAP: usize = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureSection {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Largest request body accepted at all; larger requests get 413.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    #[serde(default = "default_true")]
    pub request_headers: bool,
    #[serde(default = "default_true")]
    pub request_body: bool,
    #[serde(default = "default_true")]
    pub response_headers: bool,
    #[serde(default = "default_true")]
    pub response_body: bool,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_request_bytes: default_max_request_bytes(),
            request_headers: true,
            request_body: true,
            response_headers: true,
            response_body: true,
        }
    }
}

impl CaptureSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BODY_CAP).contains(&self.max_body_bytes) {
            return Err(TraceWallError::BadRequest(format!(
                "capture.max_body_bytes must be between 1 and {MAX_BODY_CAP}"
            )));
        }
        if !(1..=MAX_REQUEST_CAP).contains(&self.max_request_bytes) {
            return Err(TraceWallError::BadRequest(format!(
                "capture.max_request_bytes must be between 1 and {MAX_REQUEST_CAP}"
            )));
        }
        Ok(())
    }
}

fn default_max_body_bytes() -> usize {
    128 * 1024
}
fn default_max_request_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockingSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_status_code")]
    pub status_code: u16,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for BlockingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_timeout_ms(),
            status_code: default_status_code(),
            rules: Vec::new(),
        }
    }
}

impl BlockingSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60000).contains(&self.timeout_ms) {
            return Err(TraceWallError::BadRequest(
                "blocking.timeout_ms must be between 1 and 60000".into(),
            ));
        }
        if !(400..=599).contains(&self.status_code) {
            return Err(TraceWallError::BadRequest(
                "blocking.status_code must be a 4xx or 5xx status".into(),
            ));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    250
}
fn default_status_code() -> u16 {
    403
}

/// Raw blocking rule; compiled by `evaluator::rules`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub id: String,
    pub reason: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    /// `name:value` or `name:*`.
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub body_contains: Option<String>,
}

/// Telemetry attribute names. Owned by the integrating system.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeNames {
    #[serde(default = "default_request_header_prefix")]
    pub request_header_prefix: String,
    #[serde(default = "default_response_header_prefix")]
    pub response_header_prefix: String,
    #[serde(default = "default_request_body")]
    pub request_body: String,
    #[serde(default = "default_response_body")]
    pub response_body: String,
    #[serde(default = "default_blocking_result")]
    pub blocking_result: String,
    #[serde(default = "default_blocking_reason")]
    pub blocking_reason: String,
    #[serde(default = "default_evaluation_error")]
    pub evaluation_error: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            request_header_prefix: default_request_header_prefix(),
            response_header_prefix: default_response_header_prefix(),
            request_body: default_request_body(),
            response_body: default_response_body(),
            blocking_result: default_blocking_result(),
            blocking_reason: default_blocking_reason(),
            evaluation_error: default_evaluation_error(),
        }
    }
}

impl AttributeNames {
    pub fn validate(&self) -> Result<()> {
        let fixed = [
            ("request_body", &self.request_body),
            ("response_body", &self.response_body),
            ("blocking_result", &self.blocking_result),
            ("blocking_reason", &self.blocking_reason),
            ("evaluation_error", &self.evaluation_error),
        ];
        let prefixes = [
            ("request_header_prefix", &self.request_header_prefix),
            ("response_header_prefix", &self.response_header_prefix),
        ];

        for (field, v) in fixed.iter().chain(prefixes.iter()) {
            if v.trim().is_empty() {
                return Err(TraceWallError::BadRequest(format!("attributes.{field} must not be empty")));
            }
        }
        for (i, (a, va)) in fixed.iter().enumerate() {
            for (b, vb) in &fixed[i + 1..] {
                if va == vb {
                    return Err(TraceWallError::BadRequest(format!(
                        "attributes.{a} and attributes.{b} must differ"
                    )));
                }
            }
        }
        if self.request_header_prefix == self.response_header_prefix {
            return Err(TraceWallError::BadRequest(
                "attributes.request_header_prefix and response_header_prefix must differ".into(),
            ));
        }
        Ok(())
    }
}

fn default_request_header_prefix() -> String {
    "request.header.".into()
}
fn default_response_header_prefix() -> String {
    "response.header.".into()
}
fn default_request_body() -> String {
    "request.body".into()
}
fn default_response_body() -> String {
    "response.body".into()
}
fn default_blocking_result() -> String {
    "hypertrace.opa.result".into()
}
fn default_blocking_reason() -> String {
    "hypertrace.opa.reason".into()
}
fn default_evaluation_error() -> String {
    "hypertrace.opa.error".into()
}
