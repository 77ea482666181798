//! Shared error type across tracewall crates.

use std::time::Duration;

use thiserror::Error;

/// Stable error codes (used in logs and telemetry attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Message type or imported file missing after a namespace rebuild.
    DescriptorNotFound,
    /// Malformed or incompatible bytes while re-encoding.
    Serialization,
    /// Same schema file name already rebuilt with different content.
    SchemaConflict,
    /// Policy backend failure.
    Evaluation,
    /// Invalid input / configuration.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal invariant broken.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DescriptorNotFound => "DESCRIPTOR_NOT_FOUND",
            ErrorKind::Serialization => "SERIALIZATION",
            ErrorKind::SchemaConflict => "SCHEMA_CONFLICT",
            ErrorKind::Evaluation => "EVALUATION",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TraceWallError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum TraceWallError {
    #[error("descriptor not found: {0}")]
    DescriptorNotFound(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("schema conflict: {0}")]
    SchemaConflict(String),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl TraceWallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TraceWallError::DescriptorNotFound(_) => ErrorKind::DescriptorNotFound,
            TraceWallError::Serialization(_) => ErrorKind::Serialization,
            TraceWallError::SchemaConflict(_) => ErrorKind::SchemaConflict,
            TraceWallError::Evaluation(_) => ErrorKind::Evaluation,
            TraceWallError::BadRequest(_) => ErrorKind::BadRequest,
            TraceWallError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            TraceWallError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Failure of a blocking evaluator. Always fail-open at the controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("policy backend unreachable: {0}")]
    Unreachable(String),
    #[error("policy evaluation timed out after {0:?}")]
    Timeout(Duration),
    #[error("policy backend error: {0}")]
    Backend(String),
}

impl EvaluationError {
    /// Short code recorded as the evaluation-error attribute value.
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationError::Unreachable(_) => "unreachable",
            EvaluationError::Timeout(_) => "timeout",
            EvaluationError::Backend(_) => "backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_error_maps_to_evaluation_kind() {
        let e: TraceWallError = EvaluationError::Timeout(Duration::from_millis(5)).into();
        assert_eq!(e.kind().as_str(), "EVALUATION");
        assert!(e.to_string().contains("timed out"));
    }
}
