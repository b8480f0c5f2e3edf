//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use relay_settings::RelaySettings;
use serde::{Deserialize, Serialize};

/// Runtime configuration for the relay server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent `WebSocket` connections.
    pub max_connections: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a client after this many seconds without any inbound frame.
    pub heartbeat_timeout_secs: u64,
    /// Max `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// Per-recipient broadcast send deadline in milliseconds.
    pub send_timeout_ms: u64,
    /// Outbound queue size per connection.
    pub outbound_queue_capacity: usize,
    /// Directory served for non-API paths.
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Broadcast send deadline.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }

    /// Ping and liveness check interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Silence tolerated before a client is dropped.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

impl From<&RelaySettings> for ServerConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_connections: settings.server.max_connections,
            heartbeat_interval_secs: settings.heartbeat.interval_secs,
            heartbeat_timeout_secs: settings.heartbeat.timeout_secs,
            max_message_size: settings.server.max_message_size,
            send_timeout_ms: settings.hub.send_timeout_ms,
            outbound_queue_capacity: settings.hub.outbound_queue_capacity,
            static_dir: settings.server.static_dir.as_ref().map(PathBuf::from),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}
