//! # relay-server
//!
//! Connection hub and Axum `WebSocket` server for the relay.
//!
//! - [`hub::Hub`]: registry of live connections with best-effort fan-out
//! - [`session::run_session`]: per-connection receive → broadcast loop
//! - [`websocket`]: `Connection` adapter over Axum sockets, writer task, heartbeat
//! - [`server::RelayServer`]: `/ws`, `/health`, `/metrics`, static files
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use hub::{BroadcastReport, Hub};
pub use server::RelayServer;
