//! Connection-scoped failure taxonomy.
//!
//! Every error here is local to one connection. None of them are fatal to
//! the process: a [`RecvError`] ends the failing connection's own session,
//! and a [`SendError`] evicts the failing recipient from the hub.

use std::time::Duration;

use thiserror::Error;

/// Why a connection's inbound path stopped yielding messages.
#[derive(Debug, Error)]
pub enum RecvError {
    /// The peer closed the connection, or it was closed locally.
    #[error("connection closed")]
    Closed,
    /// A frame arrived that is not a valid message.
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RecvError {
    /// Whether this is an orderly close rather than a fault.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Why a write to one recipient failed.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection is already closed.
    #[error("connection closed")]
    Closed,
    /// The recipient's outbound queue is full.
    #[error("outbound queue full")]
    Full,
    /// The send did not complete within the deadline.
    #[error("send timed out after {0:?}")]
    TimedOut(Duration),
    /// The message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SendError {
    /// Short machine-readable label, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Full => "full",
            Self::TimedOut(_) => "timeout",
            Self::Encode(_) => "encode",
            Self::Transport(_) => "transport",
        }
    }
}
