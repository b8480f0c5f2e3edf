//! Per-connection session loop.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use relay_core::{Connection, RecvError};
use tracing::{debug, info, instrument, warn};

use crate::hub::Hub;
use crate::metrics::{
    CONNECTION_DURATION_SECONDS, CONNECTIONS_TOTAL, DISCONNECTIONS_TOTAL, MESSAGES_RECEIVED_TOTAL,
};

/// How a session ended.
#[derive(Debug)]
pub struct SessionSummary {
    /// Messages received and broadcast.
    pub relayed: u64,
    /// The receive failure that ended the loop.
    pub ended_by: RecvError,
}

/// Drive one connection from registration to teardown.
///
/// Registers `conn`, then broadcasts every message it receives until receive
/// fails for any reason. Then unregisters it and, if it was still a member,
/// closes it. A connection arriving after [`Hub::close_all`] is closed right
/// away. Failures never propagate past this function.
#[instrument(skip_all, fields(conn_id = %conn.id()))]
pub async fn run_session(conn: Arc<dyn Connection>, hub: &Hub) -> SessionSummary {
    let id = conn.id();
    let started = Instant::now();

    if !hub.register(conn.clone()) {
        info!("hub closed, dropping client");
        conn.close().await;
        return SessionSummary {
            relayed: 0,
            ended_by: RecvError::Closed,
        };
    }
    counter!(CONNECTIONS_TOTAL).increment(1);
    info!("client connected");

    let mut relayed = 0u64;
    let ended_by = loop {
        match conn.receive().await {
            Ok(message) => {
                counter!(MESSAGES_RECEIVED_TOTAL).increment(1);
                let report = hub.broadcast(&message).await;
                relayed += 1;
                debug!(
                    user = %message.user,
                    delivered = report.delivered,
                    evicted = report.evicted,
                    "message relayed"
                );
            }
            Err(error) => break error,
        }
    };

    if ended_by.is_clean_close() {
        info!(relayed, "client disconnected");
    } else {
        warn!(relayed, error = %ended_by, "receive failed, dropping client");
    }

    // Eviction or shutdown may already have removed and closed it.
    if hub.unregister(id) {
        conn.close().await;
    }
    counter!(DISCONNECTIONS_TOTAL).increment(1);
    histogram!(CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

    SessionSummary { relayed, ended_by }
}
