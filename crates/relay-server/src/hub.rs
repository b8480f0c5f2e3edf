//! Connection registry and broadcast engine.
//!
//! The [`Hub`] owns the set of live connections. Membership is guarded by a
//! single `RwLock`; broadcast passes are serialized by a separate async
//! mutex so two passes never write to the same connection at once.
//!
//! A broadcast pass:
//! 1. snapshots membership under the read lock and releases it
//! 2. sends to every snapshot member concurrently, each under the send deadline
//! 3. evicts (removes, then closes) every member whose send failed
//!
//! Removal is keyed on [`ConnectionId`] and whoever actually removes a member
//! is the one that closes it, so a connection is closed at most once no matter
//! how unregister, eviction and [`Hub::close_all`] interleave.
//!
//! Once [`Hub::close_all`] has run the hub stays closed and refuses every
//! later registration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use parking_lot::RwLock;
use relay_core::{Connection, ConnectionId, Message, SendError};
use tracing::{debug, warn};

use crate::metrics::{
    BROADCAST_DURATION_SECONDS, BROADCASTS_TOTAL, CONNECTIONS_ACTIVE, DELIVERIES_TOTAL,
    SEND_FAILURES_TOTAL,
};

/// Outcome of one broadcast pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members in the snapshot the pass sent to.
    pub recipients: usize,
    /// Sends that succeeded.
    pub delivered: usize,
    /// Members removed and closed by this pass.
    pub evicted: usize,
}

/// Registry of live connections with best-effort fan-out.
pub struct Hub {
    members: RwLock<HashMap<ConnectionId, Arc<dyn Connection>>>,
    fanout: tokio::sync::Mutex<()>,
    send_timeout: Duration,
    closed: AtomicBool,
}

impl Hub {
    /// Create an empty hub. A send slower than `send_timeout` counts as failed.
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            fanout: tokio::sync::Mutex::new(()),
            send_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Add a connection, replacing any existing entry with the same id.
    ///
    /// Returns `false` without adding it once [`Hub::close_all`] has run; the
    /// caller then still owns closing it.
    pub fn register(&self, conn: Arc<dyn Connection>) -> bool {
        let id = conn.id();
        let size = {
            let mut members = self.members.write();
            // Checked under the write lock so close_all cannot drain in between
            if self.closed.load(Ordering::SeqCst) {
                debug!(conn_id = %id, "hub closed, registration refused");
                return false;
            }
            let _ = members.insert(id, conn);
            members.len()
        };
        record_size(size);
        debug!(conn_id = %id, members = size, "connection registered");
        true
    }

    /// Remove a connection if present.
    ///
    /// Returns `true` only for the call that actually removed it; the caller
    /// then owns closing it.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        self.remove(id).is_some()
    }

    /// Send `message` to every current member.
    ///
    /// Never fails as a whole. Members whose send fails or misses the
    /// deadline are removed and closed before this returns; nothing is
    /// retried and the other members are unaffected.
    pub async fn broadcast(&self, message: &Message) -> BroadcastReport {
        let _pass = self.fanout.lock().await;
        let started = Instant::now();

        let snapshot: Vec<Arc<dyn Connection>> = self.members.read().values().cloned().collect();
        let deadline = self.send_timeout;
        let sends = snapshot.iter().map(|conn| async move {
            let result = tokio::time::timeout(deadline, conn.send(message))
                .await
                .unwrap_or(Err(SendError::TimedOut(deadline)));
            (conn, result)
        });
        let results = futures::future::join_all(sends).await;

        let mut report = BroadcastReport {
            recipients: snapshot.len(),
            ..BroadcastReport::default()
        };
        for (conn, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    counter!(SEND_FAILURES_TOTAL, "reason" => error.kind()).increment(1);
                    warn!(conn_id = %conn.id(), error = %error, "send failed, evicting recipient");
                    if self.evict(conn.id()).await {
                        report.evicted += 1;
                    }
                }
            }
        }

        counter!(BROADCASTS_TOTAL).increment(1);
        counter!(DELIVERIES_TOTAL).increment(report.delivered as u64);
        histogram!(BROADCAST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        debug!(
            recipients = report.recipients,
            delivered = report.delivered,
            evicted = report.evicted,
            "broadcast complete"
        );
        report
    }

    /// Remove and close every member, and refuse later registrations.
    ///
    /// Returns how many members were closed.
    pub async fn close_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<Arc<dyn Connection>> = {
            let mut members = self.members.write();
            members.drain().map(|(_, conn)| conn).collect()
        };
        record_size(0);
        let _ = futures::future::join_all(drained.iter().map(|conn| conn.close())).await;
        drained.len()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    /// Whether the hub has no members.
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Whether [`Hub::close_all`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.read().contains_key(&id)
    }

    async fn evict(&self, id: ConnectionId) -> bool {
        match self.remove(id) {
            Some(conn) => {
                conn.close().await;
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: ConnectionId) -> Option<Arc<dyn Connection>> {
        let (removed, size) = {
            let mut members = self.members.write();
            let removed = members.remove(&id);
            (removed, members.len())
        };
        if removed.is_some() {
            record_size(size);
            debug!(conn_id = %id, members = size, "connection removed");
        }
        removed
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_size(size: usize) {
    gauge!(CONNECTIONS_ACTIVE).set(size as f64);
}
