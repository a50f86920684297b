//! Error types used across `chatrelay`.
//!
//! None of these ever escape the broker: it logs and drops. The connector
//! folds them into boolean results for its caller.

use thiserror::Error;

/// Why an inbound frame could not be routed or typed.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame has no `type` field")]
    MissingType,
    #[error("unrecognized frame type `{0}`")]
    UnknownType(String),
    #[error("frame has no string `channel` field")]
    MissingChannel,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection is not open")]
    NotOpen,
    #[error("connection closed")]
    Closed,
}

/// Outcome of a readiness wait that never saw the connection open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("connection did not open after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("connection closed while waiting for it to open")]
    Closed,
}
