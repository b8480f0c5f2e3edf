//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`,
//! so a partial settings file only needs the keys it changes.

use relay_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Listener and HTTP surface.
    pub server: ServerSettings,
    /// Broadcast engine tuning.
    pub hub: HubSettings,
    /// WebSocket liveness checks.
    pub heartbeat: HeartbeatSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Listener and HTTP surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Directory served at `/`; `None` disables static files.
    pub static_dir: Option<String>,
    /// Upgrades beyond this many live connections are refused.
    pub max_connections: usize,
    /// Largest inbound WebSocket message, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: Some("./static".into()),
            max_connections: 1024,
            max_message_size: 64 * 1024,
        }
    }
}

/// Broadcast engine tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Per-recipient send deadline; a slower send evicts the recipient.
    pub send_timeout_ms: u64,
    /// Bounded outbound queue per WebSocket connection.
    pub outbound_queue_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
            outbound_queue_capacity: 256,
        }
    }
}

/// WebSocket liveness checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeartbeatSettings {
    /// Seconds between pings.
    pub interval_secs: u64,
    /// Seconds of silence before the connection is dropped.
    pub timeout_secs: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_secs: 90,
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Line format on stderr.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

impl RelaySettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be > 0".into(),
            ));
        }
        if self.server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxMessageSize must be > 0".into(),
            ));
        }
        if self.hub.send_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.sendTimeoutMs must be > 0".into(),
            ));
        }
        if self.hub.outbound_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.outboundQueueCapacity must be > 0".into(),
            ));
        }
        if self.heartbeat.interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeat.intervalSecs must be > 0".into(),
            ));
        }
        if self.heartbeat.timeout_secs < self.heartbeat.interval_secs {
            return Err(SettingsError::InvalidValue(
                "heartbeat.timeoutSecs must be >= heartbeat.intervalSecs".into(),
            ));
        }
        Ok(())
    }
}
