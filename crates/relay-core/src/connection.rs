//! Transport-agnostic connection abstraction.
//!
//! The hub never constructs connections. A transport (WebSocket, or the
//! in-memory one in [`crate::testing`]) builds them once the handshake is
//! done and hands them over as `Arc<dyn Connection>`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{RecvError, SendError};
use crate::message::Message;

/// Unique identity of one live connection (UUID v7, time-ordered).
///
/// Two connections never share an ID, so the hub keys membership on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// One client's persistent bidirectional channel.
///
/// `receive` is only ever called by the connection's own session task.
/// `send` may be called by any broadcaster; the hub serializes broadcast
/// passes so two sends to the same connection never overlap. `close` must be
/// idempotent and safe to call from any task, and once it has been called a
/// pending or future `receive` must fail and `send` must not succeed.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Identity of this connection.
    fn id(&self) -> ConnectionId;

    /// Wait for the next decoded message from the peer.
    async fn receive(&self) -> Result<Message, RecvError>;

    /// Deliver one message to the peer.
    async fn send(&self, message: &Message) -> Result<(), SendError>;

    /// Close the connection. Calling it more than once has no further effect.
    async fn close(&self);
}
