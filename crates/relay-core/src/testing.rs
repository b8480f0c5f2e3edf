//! In-memory [`Connection`] for exercising the hub without sockets.
//!
//! [`MemoryConnection::pair`] returns the hub-facing connection together with
//! a [`MemoryPeer`] that plays the remote client: it injects inbound
//! messages and collects whatever the hub delivers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, ConnectionId};
use crate::errors::{RecvError, SendError};
use crate::message::Message;

/// Hub-facing half of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Message, RecvError>>>,
    outbound: mpsc::UnboundedSender<Message>,
    closed: CancellationToken,
    close_calls: AtomicUsize,
    send_calls: AtomicUsize,
    fail_next_send: AtomicBool,
    fail_all_sends: AtomicBool,
    send_delay: Mutex<Option<Duration>>,
}

/// Client-facing half of an in-memory connection.
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<Result<Message, RecvError>>,
    outbound: mpsc::UnboundedReceiver<Message>,
}

impl MemoryConnection {
    /// Create a connected pair.
    pub fn pair() -> (Arc<Self>, MemoryPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            id: ConnectionId::new(),
            inbound: tokio::sync::Mutex::new(in_rx),
            outbound: out_tx,
            closed: CancellationToken::new(),
            close_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            fail_next_send: AtomicBool::new(false),
            fail_all_sends: AtomicBool::new(false),
            send_delay: Mutex::new(None),
        });
        let peer = MemoryPeer {
            inbound: in_tx,
            outbound: out_rx,
        };
        (conn, peer)
    }

    /// Make the next `send` fail with a transport error.
    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent `send` fail with a transport error.
    pub fn fail_all_sends(&self) {
        self.fail_all_sends.store(true, Ordering::SeqCst);
    }

    /// Delay every subsequent `send` by `delay` before it completes.
    pub fn stall_sends(&self, delay: Duration) {
        *self.send_delay.lock() = Some(delay);
    }

    /// How many times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// How many times `send` has been called, successful or not.
    pub fn send_count(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called at least once.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn receive(&self) -> Result<Message, RecvError> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            () = self.closed.cancelled() => Err(RecvError::Closed),
            next = inbound.recv() => next.unwrap_or(Err(RecvError::Closed)),
        }
    }

    async fn send(&self, message: &Message) -> Result<(), SendError> {
        let _ = self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }
        if self.fail_all_sends.load(Ordering::SeqCst)
            || self.fail_next_send.swap(false, Ordering::SeqCst)
        {
            return Err(SendError::Transport("injected send failure".into()));
        }
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.outbound
            .send(message.clone())
            .map_err(|_| SendError::Closed)
    }

    async fn close(&self) {
        let _ = self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.cancel();
    }
}

impl MemoryPeer {
    /// Deliver a message to the connection's inbound side.
    pub fn push(&self, message: Message) {
        let _ = self.inbound.send(Ok(message));
    }

    /// Make the connection's next `receive` fail with `error`.
    pub fn push_error(&self, error: RecvError) {
        let _ = self.inbound.send(Err(error));
    }

    /// Drop the inbound side; the connection then observes `RecvError::Closed`.
    pub fn disconnect(self) {
        drop(self);
    }

    /// Next delivered message, if one is already queued.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.outbound.try_recv().ok()
    }

    /// Wait for the next delivered message.
    pub async fn recv(&mut self) -> Option<Message> {
        self.outbound.recv().await
    }

    /// Every delivered message currently queued.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound.try_recv() {
            out.push(msg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn receive_yields_pushed_messages_in_order() {
        let (conn, peer) = MemoryConnection::pair();
        peer.push(Message::new("one", "a"));
        peer.push(Message::new("two", "a"));
        assert_eq!(conn.receive().await.unwrap().text, "one");
        assert_eq!(conn.receive().await.unwrap().text, "two");
    }

    #[tokio::test]
    async fn receive_after_disconnect_is_closed() {
        let (conn, peer) = MemoryConnection::pair();
        peer.disconnect();
        assert_matches!(conn.receive().await, Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn receive_returns_injected_error() {
        let (conn, peer) = MemoryConnection::pair();
        peer.push_error(RecvError::Transport("reset".into()));
        assert_matches!(conn.receive().await, Err(RecvError::Transport(_)));
    }

    #[tokio::test]
    async fn close_unblocks_pending_receive() {
        let (conn, _peer) = MemoryConnection::pair();
        let reader = conn.clone();
        let handle = tokio::spawn(async move { reader.receive().await });
        tokio::task::yield_now().await;
        conn.close().await;
        assert_matches!(handle.await.unwrap(), Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn send_reaches_peer() {
        let (conn, mut peer) = MemoryConnection::pair();
        conn.send(&Message::new("hi", "x")).await.unwrap();
        assert_eq!(peer.try_recv(), Some(Message::new("hi", "x")));
    }

    #[tokio::test]
    async fn fail_next_send_fails_once() {
        let (conn, mut peer) = MemoryConnection::pair();
        conn.fail_next_send();
        assert_matches!(
            conn.send(&Message::new("a", "x")).await,
            Err(SendError::Transport(_))
        );
        conn.send(&Message::new("b", "x")).await.unwrap();
        assert_eq!(peer.drain(), vec![Message::new("b", "x")]);
        assert_eq!(conn.send_count(), 2);
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (conn, _peer) = MemoryConnection::pair();
        conn.close().await;
        assert_matches!(
            conn.send(&Message::new("a", "x")).await,
            Err(SendError::Closed)
        );
    }

    #[tokio::test]
    async fn close_is_counted_every_call() {
        let (conn, _peer) = MemoryConnection::pair();
        assert!(!conn.is_closed());
        conn.close().await;
        conn.close().await;
        assert!(conn.is_closed());
        assert_eq!(conn.close_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_send_waits() {
        let (conn, mut peer) = MemoryConnection::pair();
        conn.stall_sends(Duration::from_secs(10));
        let sender = conn.clone();
        let handle = tokio::spawn(async move { sender.send(&Message::new("slow", "x")).await });
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(peer.try_recv().is_none());
        tokio::time::sleep(Duration::from_secs(6)).await;
        handle.await.unwrap().unwrap();
        assert_eq!(peer.try_recv(), Some(Message::new("slow", "x")));
    }
}
