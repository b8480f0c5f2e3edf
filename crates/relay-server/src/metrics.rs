//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup, before any metrics are recorded. A second install
/// in the same process fails.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos across modules.

/// Connections registered total (counter).
pub const CONNECTIONS_TOTAL: &str = "relay_connections_total";
/// Connections whose session has ended (counter).
pub const DISCONNECTIONS_TOTAL: &str = "relay_disconnections_total";
/// Current hub membership (gauge).
pub const CONNECTIONS_ACTIVE: &str = "relay_connections_active";
/// Messages received from clients (counter).
pub const MESSAGES_RECEIVED_TOTAL: &str = "relay_messages_received_total";
/// Broadcast passes (counter).
pub const BROADCASTS_TOTAL: &str = "relay_broadcasts_total";
/// Successful per-recipient sends (counter).
pub const DELIVERIES_TOTAL: &str = "relay_deliveries_total";
/// Failed per-recipient sends (counter, labels: reason).
pub const SEND_FAILURES_TOTAL: &str = "relay_send_failures_total";
/// Wall time of one broadcast pass (histogram).
pub const BROADCAST_DURATION_SECONDS: &str = "relay_broadcast_duration_seconds";
/// Lifetime of one connection session (histogram).
pub const CONNECTION_DURATION_SECONDS: &str = "relay_connection_duration_seconds";
