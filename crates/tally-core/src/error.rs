//! Shared error type across tally crates.

use thiserror::Error;

use crate::registry::MetricKind;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Instrument misuse: wrong kind, wrong label arity, negative delta.
    InvalidMutation,
    /// Name collision or malformed identifier at declaration time.
    InvalidDeclaration,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::InvalidMutation => "INVALID_MUTATION",
            ClientCode::InvalidDeclaration => "INVALID_DECLARATION",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),
    #[error("invalid delta for counter {metric}: {delta} (counters only go up)")]
    InvalidDelta { metric: String, delta: f64 },
    #[error("label arity mismatch for {metric}: expected {expected} values, got {got}")]
    LabelArityMismatch {
        metric: String,
        expected: usize,
        got: usize,
    },
    #[error("{metric} is a {actual}, not a {expected}")]
    KindMismatch {
        metric: String,
        expected: MetricKind,
        actual: MetricKind,
    },
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl TallyError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TallyError::DuplicateMetric(_) | TallyError::InvalidName(_) => {
                ClientCode::InvalidDeclaration
            }
            TallyError::InvalidDelta { .. }
            | TallyError::LabelArityMismatch { .. }
            | TallyError::KindMismatch { .. } => ClientCode::InvalidMutation,
            TallyError::BadRequest(_) => ClientCode::BadRequest,
            TallyError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            TallyError::Internal(_) => ClientCode::Internal,
        }
    }
}
