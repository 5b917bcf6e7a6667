//! Error taxonomy reported across the boundary.
//!
//! Every boundary call returns `Result<_, ClientError>`.  The C ABI turns the
//! error into an owned C string; Rust callers get the value directly.
//!
//! Engine failures ([`EngineError`]) are mapped by the operation that was
//! running when they happened: a network failure during `connect` is a
//! connection error, the same failure mid-stream is a transport error.

use rdp_core::{EngineError, ParamsError};
use thiserror::Error;

/// Coarse classification of a [`ClientError`], stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Protocol,
    Usage,
    Callback,
    Transport,
    Rejected,
}

impl ErrorKind {
    /// Short lowercase name, used as a message prefix at the C ABI.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Usage => "usage",
            ErrorKind::Callback => "callback",
            ErrorKind::Transport => "transport",
            ErrorKind::Rejected => "rejected",
        }
    }
}

/// Failures reported by boundary operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Transport, handshake, or authentication failed during connect.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Connect parameters failed validation before any I/O happened.
    #[error("invalid connection parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    /// The engine produced malformed or unsupported data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The call is not allowed in the handle's current state.
    #[error("usage error: {0}")]
    Usage(String),

    /// The host's tile callback reported a failure.
    #[error("tile callback failed: {0}")]
    Callback(String),

    /// The session is closing, or its transport failed after connect.
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine refused an input event.
    #[error("input rejected: {0}")]
    Rejected(String),

    /// The async runtime could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ClientError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Connection(_) | ClientError::InvalidParams(_) => ErrorKind::Connection,
            ClientError::Protocol(_) => ErrorKind::Protocol,
            ClientError::Usage(_) | ClientError::Runtime(_) => ErrorKind::Usage,
            ClientError::Callback(_) => ErrorKind::Callback,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Rejected(_) => ErrorKind::Rejected,
        }
    }

    /// Error for a handle that is null, never issued, or already freed.
    pub fn stale_handle() -> Self {
        ClientError::Usage("handle does not refer to a live session".to_string())
    }

    /// Error for input or streaming on a session that is shutting down.
    pub fn session_closing() -> Self {
        ClientError::Transport("session is closing".to_string())
    }

    /// Maps an engine failure raised while connecting.
    pub fn from_connect_failure(err: EngineError) -> Self {
        ClientError::Connection(err.to_string())
    }

    /// Maps an engine failure raised while fetching display updates.
    pub fn from_stream_failure(err: EngineError) -> Self {
        match err {
            EngineError::Decode(msg) => ClientError::Protocol(msg),
            EngineError::Closed => ClientError::session_closing(),
            other => ClientError::Transport(other.to_string()),
        }
    }

    /// Maps an engine failure raised while injecting input.
    pub fn from_input_failure(err: EngineError) -> Self {
        match err {
            EngineError::Rejected(msg) => ClientError::Rejected(msg),
            EngineError::Closed => ClientError::session_closing(),
            other => ClientError::Transport(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Runtime(err.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
