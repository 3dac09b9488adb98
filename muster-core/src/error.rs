//! Error types for Muster session operations

use thiserror::Error;

/// Session layer errors.
///
/// Cloneable so every waiter on a deduplicated fetch receives the same
/// failure value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Identity query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Identity payload was malformed: {reason}")]
    MalformedPayload { reason: String },

    #[error("Session event stream closed: {reason}")]
    StreamClosed { reason: String },

    #[error("Identity fetch was abandoned before completion")]
    FetchAbandoned,

    #[error("Session bootstrap is already running for this cache")]
    AlreadyBootstrapped,

    #[error("Sign-out request failed: {reason}")]
    SignOutFailed { reason: String },
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
