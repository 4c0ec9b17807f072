use tracing::warn;

use crate::{connection::ConnectionHandle, error::TransportError};

/// Behaviour bound to connections by a [`crate::Listener`] or [`crate::Dialer`].
///
/// A listener shares one instance across every connection it accepts, so
/// hooks may run concurrently for different connections. Any state shared
/// between connections has to be synchronised by the implementation. Hooks for
/// a single connection never overlap and run on that connection's task, so
/// they should not block for long.
pub trait Application: Send + Sync + 'static {
    /// Called once, before the first frame is read.
    fn on_connected(&self, conn: &ConnectionHandle);

    /// Called once per received frame, in arrival order. Returning `false`
    /// closes the connection without an error.
    fn on_message(&self, conn: &ConnectionHandle, payload: &[u8]) -> bool;

    /// Called when an outbound frame could not be written. The connection is
    /// closed with `error` right after.
    fn on_write_error(&self, conn: &ConnectionHandle, error: &TransportError, payload: &[u8]) {
        warn!(
            id = %conn.id(),
            %error,
            bytes = payload.len(),
            "failed to write frame"
        );
    }

    /// Called exactly once when the connection is torn down. `error` is `None`
    /// for graceful or locally requested closes.
    fn on_closed(&self, conn: &ConnectionHandle, error: Option<&TransportError>);
}
