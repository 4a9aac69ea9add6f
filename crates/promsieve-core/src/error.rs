//! Shared error type across promsieve crates.

use std::time::Duration;

use thiserror::Error;

/// Stable error codes, used for logs, self-metrics labels and HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid configuration (startup-fatal).
    Config,
    /// Upstream could not be reached or answered with a failure status.
    UpstreamUnavailable,
    /// Upstream did not answer within the configured timeout.
    UpstreamTimeout,
    /// Upstream answered, but the body is not an exposition at all.
    Unparseable,
    /// Rendering the filtered exposition failed.
    Serialization,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "CONFIG",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorCode::Unparseable => "UNPARSEABLE",
            ErrorCode::Serialization => "SERIALIZATION",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// True for failures caused by the upstream rather than by us.
    pub fn is_upstream(self) -> bool {
        matches!(
            self,
            ErrorCode::UpstreamUnavailable | ErrorCode::UpstreamTimeout | ErrorCode::Unparseable
        )
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SieveError>;

/// Unified error type used by core and proxy.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("config: {0}")]
    Config(String),
    #[error("config: proxies[{proxy}].label_filters[{rule}].{field}: {reason}")]
    InvalidRule {
        proxy: usize,
        rule: usize,
        field: String,
        reason: String,
    },
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),
    #[error("upstream body unparseable: {0}")]
    Unparseable(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SieveError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SieveError::Config(_) | SieveError::InvalidRule { .. } => ErrorCode::Config,
            SieveError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            SieveError::UpstreamTimeout(_) => ErrorCode::UpstreamTimeout,
            SieveError::Unparseable(_) => ErrorCode::Unparseable,
            SieveError::Serialization(_) => ErrorCode::Serialization,
            SieveError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// What went wrong on a single exposition line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidMetricName,
    UnterminatedLabels,
    InvalidLabel(String),
    DuplicateLabel(String),
    MissingValue,
    InvalidValue(String),
    InvalidTimestamp(String),
    TrailingData(String),
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::InvalidMetricName => f.write_str("invalid metric name"),
            ParseErrorKind::UnterminatedLabels => f.write_str("unterminated label set"),
            ParseErrorKind::InvalidLabel(s) => write!(f, "invalid label: {s}"),
            ParseErrorKind::DuplicateLabel(s) => write!(f, "duplicate label: {s}"),
            ParseErrorKind::MissingValue => f.write_str("missing value"),
            ParseErrorKind::InvalidValue(s) => write!(f, "invalid value: {s}"),
            ParseErrorKind::InvalidTimestamp(s) => write!(f, "invalid timestamp: {s}"),
            ParseErrorKind::TrailingData(s) => write!(f, "unexpected trailing data: {s}"),
        }
    }
}

/// Malformed exposition line. Recoverable: the line is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-indexed line number in the upstream body.
    pub line: usize,
    pub kind: ParseErrorKind,
}
