//! # relay-core
//!
//! Foundation types shared by every relay crate:
//!
//! - **Message**: the `{ text, user }` chat payload and its JSON codec
//! - **Connection**: the transport-agnostic bidirectional channel the hub fans out to
//! - **Errors**: receive/send failure taxonomy via `thiserror`
//! - **Logging**: `tracing` subscriber initialization
//! - **Testing** (feature `testing`): an in-memory `Connection` for hub tests

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod logging;
pub mod message;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::{Connection, ConnectionId};
pub use errors::{RecvError, SendError};
pub use message::Message;
