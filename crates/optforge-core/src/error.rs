use thiserror::Error;

use crate::commands::CommandError;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures raised by the session protocol. Every variant fails exactly one
/// operation: unless stated otherwise the session itself stays valid and
/// keeps its pre-call state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The action index falls outside the current action space. Raised
    /// before any state is mutated.
    #[error("out-of-range action {index} for action space of size {size}")]
    OutOfRangeAction { index: i64, size: i64 },

    #[error("malformed action: {0}")]
    MalformedAction(String),

    /// The session has terminated and accepts no further operations.
    #[error("session is closed")]
    SessionClosed,

    #[error("fork is not supported by this service")]
    ForkUnsupported,

    /// Session creation failed. No partially-active session persists.
    #[error("session setup failed: {0}")]
    SetupFailure(String),

    /// An external tool invocation failed or timed out. Prior session state
    /// remains valid.
    #[error(transparent)]
    ExternalTool(#[from] CommandError),

    #[error("unknown observation space: {0}")]
    UnknownObservationSpace(String),

    #[error("unknown session parameter: {0}")]
    UnknownParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
