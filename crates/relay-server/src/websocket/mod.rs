//! `WebSocket` transport: connection adapter, writer task, and heartbeat.

pub mod connection;
pub mod heartbeat;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use futures::StreamExt;
use relay_core::Connection;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::ServerConfig;
use crate::hub::Hub;
use crate::session::run_session;

use self::connection::{WsConnection, run_writer};
use self::heartbeat::{HeartbeatResult, run_heartbeat};

/// Per-socket transport settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WsOptions {
    /// Bounded outbound queue size.
    pub queue_capacity: usize,
    /// Ping and liveness check interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated before the client is dropped.
    pub heartbeat_timeout: Duration,
}

impl From<&ServerConfig> for WsOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            queue_capacity: config.outbound_queue_capacity.max(1),
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}

/// Run one upgraded socket until it closes.
///
/// Spawns the writer and heartbeat tasks, runs the session loop on the
/// current task, then waits for the writer to flush its Close frame.
pub async fn serve_socket(socket: WebSocket, hub: Arc<Hub>, options: WsOptions) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel(options.queue_capacity);
    let conn = Arc::new(WsConnection::new(stream, tx));
    let writer = tokio::spawn(run_writer(
        sink,
        rx,
        conn.closed_token(),
        options.heartbeat_interval,
    ));

    let watched = conn.clone();
    let heartbeat = tokio::spawn(async move {
        let result = run_heartbeat(
            watched.clone(),
            options.heartbeat_interval,
            options.heartbeat_timeout,
            watched.closed_token(),
        )
        .await;
        if result == HeartbeatResult::TimedOut {
            warn!(
                conn_id = %watched.id(),
                silent_for = ?watched.last_seen_elapsed(),
                "heartbeat timed out, closing connection"
            );
            watched.close().await;
        }
    });

    let _ = run_session(conn, &hub).await;

    let _ = heartbeat.await;
    let _ = writer.await;
}
