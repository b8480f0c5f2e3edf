//! `WebSocket` client connection.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message as WsMessage;
use futures::stream::BoxStream;
use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use relay_core::{Connection, ConnectionId, Message, RecvError, SendError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type Inbound = BoxStream<'static, Result<WsMessage, axum::Error>>;

/// A connected `WebSocket` client.
///
/// Outbound messages go through a bounded queue drained by [`run_writer`],
/// so `send` never waits on the socket.
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
    inbound: tokio::sync::Mutex<Inbound>,
    closed: CancellationToken,
    /// Whether any frame arrived since the last heartbeat check.
    is_alive: AtomicBool,
    last_seen: Mutex<Instant>,
    connected_at: Instant,
}

impl WsConnection {
    /// Wrap the read half of a socket and the sender side of its outbound queue.
    pub fn new<R>(inbound: R, outbound: mpsc::Sender<String>) -> Self
    where
        R: Stream<Item = Result<WsMessage, axum::Error>> + Send + 'static,
    {
        let now = Instant::now();
        Self {
            id: ConnectionId::new(),
            outbound,
            inbound: tokio::sync::Mutex::new(inbound.boxed()),
            closed: CancellationToken::new(),
            is_alive: AtomicBool::new(true),
            last_seen: Mutex::new(now),
            connected_at: now,
        }
    }

    /// Token cancelled when the connection closes.
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if any frame arrived since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last inbound frame (or connection establishment).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait]
impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn receive(&self) -> Result<Message, RecvError> {
        let mut inbound = self.inbound.lock().await;
        loop {
            let frame = tokio::select! {
                () = self.closed.cancelled() => return Err(RecvError::Closed),
                frame = inbound.next() => frame,
            };
            match frame {
                None | Some(Ok(WsMessage::Close(_))) => return Err(RecvError::Closed),
                Some(Err(e)) => return Err(RecvError::Transport(e.to_string())),
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => self.mark_alive(),
                Some(Ok(WsMessage::Text(text))) => {
                    self.mark_alive();
                    return Message::decode(text.as_str());
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    self.mark_alive();
                    return Message::decode_slice(&data);
                }
            }
        }
    }

    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }
        let json = message.encode()?;
        self.outbound.try_send(json).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    async fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!(conn_id = %self.id, age = ?self.age(), "closing connection");
        }
        self.closed.cancel();
    }
}

/// Drain the outbound queue into the socket's write half.
///
/// Sends a Ping every `ping_interval`. Exits when `closed` is cancelled
/// (after sending a Close frame), when the queue is dropped, or on the first
/// write error, which also cancels `closed`. Frames still queued when
/// `closed` is cancelled are discarded, even though the hub already counted
/// them as delivered.
pub async fn run_writer<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<String>,
    closed: CancellationToken,
    ping_interval: Duration,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: fmt::Display,
{
    let mut ping = tokio::time::interval(ping_interval);
    // Skip the immediate first tick
    let _ = ping.tick().await;

    loop {
        let frame = tokio::select! {
            biased;
            () = closed.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return;
            }
            next = queue.recv() => match next {
                Some(json) => WsMessage::Text(json.into()),
                None => return,
            },
            _ = ping.tick() => WsMessage::Ping(Bytes::new()),
        };
        if let Err(error) = sink.send(frame).await {
            warn!(%error, "websocket write failed, closing connection");
            closed.cancel();
            return;
        }
    }
}
