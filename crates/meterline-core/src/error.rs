//! Shared error type across meterline crates.

use thiserror::Error;

/// Stable error codes (safe to match on in tests and logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Name already registered with a different shape.
    DuplicateMetric,
    /// Wrong number of label values.
    LabelCardinality,
    /// Value rejected by an instrument.
    InvalidObservation,
    /// Bad metric name, label name or bucket layout.
    InvalidDescriptor,
    /// Unreadable or invalid configuration.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::LabelCardinality => "LABEL_CARDINALITY",
            ErrorCode::InvalidObservation => "INVALID_OBSERVATION",
            ErrorCode::InvalidDescriptor => "INVALID_DESCRIPTOR",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterlineError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MeterlineError {
    #[error("metric {name} already registered with a different shape: {reason}")]
    DuplicateMetric { name: String, reason: String },
    #[error("metric {name} expects {expected} label values, got {got}")]
    LabelCardinality {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MeterlineError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeterlineError::DuplicateMetric { .. } => ErrorCode::DuplicateMetric,
            MeterlineError::LabelCardinality { .. } => ErrorCode::LabelCardinality,
            MeterlineError::InvalidObservation(_) => ErrorCode::InvalidObservation,
            MeterlineError::InvalidDescriptor(_) => ErrorCode::InvalidDescriptor,
            MeterlineError::Config(_) => ErrorCode::Config,
            MeterlineError::Internal(_) => ErrorCode::Internal,
        }
    }
}
