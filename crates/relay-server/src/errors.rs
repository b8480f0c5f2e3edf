//! Server startup errors.
//!
//! Only startup can fail. Once listening, per-connection failures are
//! absorbed by the hub and the session loop.

use std::io;

use thiserror::Error;

/// Errors raised while bringing the server up.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Other socket error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The global metrics recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
