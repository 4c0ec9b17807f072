use std::io;

use thiserror::Error;

use crate::registry::ConnectionId;

/// Failure on an established connection.
///
/// Any of these ends the connection it happened on and nothing else.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection has already been torn down.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// Reading or writing the socket failed, including the peer hanging up
    /// mid-stream.
    #[error("connection i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to obtain a connection from a [`crate::Dialer`].
#[derive(Debug, Error)]
pub enum DialError {
    #[error("'{0}' is neither a port number nor a known service")]
    InvalidService(String),

    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("{host} did not resolve to any address")]
    NoAddresses { host: String },

    /// Every resolved endpoint refused; `source` is the last endpoint's error.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The dialing task went away without reporting a result.
    #[error("dialer stopped before reporting a result")]
    Abandoned,
}
