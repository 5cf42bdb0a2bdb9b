//! Shared error type across tiermetrics crates.

use thiserror::Error;

/// Stable error codes, surfaced by management tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed metric name or level list.
    InvalidName,
    /// Lookup of a metric that was never created.
    MetricNotFound,
    /// Metric exists under a different kind.
    KindMismatch,
    /// Reporter could not be built from its configuration.
    ReporterBuild,
    /// No reporter registered under the name.
    ReporterNotFound,
    /// Operation not allowed in the current state.
    IllegalState,
    /// Invalid configuration document.
    Config,
    /// Sink I/O failure.
    Export,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used by management tooling.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::MetricNotFound => "METRIC_NOT_FOUND",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::ReporterBuild => "REPORTER_BUILD",
            ErrorCode::ReporterNotFound => "REPORTER_NOT_FOUND",
            ErrorCode::IllegalState => "ILLEGAL_STATE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Export => "EXPORT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metric name: {0}")]
    InvalidName(String),
    #[error("metric not found: {0}")]
    MetricNotFound(String),
    #[error("metric {name} is a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("reporter build failed: {0}")]
    ReporterBuild(String),
    #[error("reporter not found: {0}")]
    ReporterNotFound(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
    #[error("config: {0}")]
    Config(String),
    #[error("export failed: {0}")]
    Export(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
            MetricsError::MetricNotFound(_) => ErrorCode::MetricNotFound,
            MetricsError::KindMismatch { .. } => ErrorCode::KindMismatch,
            MetricsError::ReporterBuild(_) => ErrorCode::ReporterBuild,
            MetricsError::ReporterNotFound(_) => ErrorCode::ReporterNotFound,
            MetricsError::IllegalState(_) => ErrorCode::IllegalState,
            MetricsError::Config(_) => ErrorCode::Config,
            MetricsError::Export(_) => ErrorCode::Export,
            MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
