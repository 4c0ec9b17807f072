use tracing::debug;

use crate::{
    application::Application, connection::ConnectionHandle, console, error::TransportError,
};

/// Plain chat participant: prints what arrives, stdin supplies what leaves.
#[derive(Debug, Default)]
pub struct ChatClient;

impl Application for ChatClient {
    fn on_connected(&self, conn: &ConnectionHandle) {
        debug!(id = %conn.id(), peer = ?conn.peer_addr(), "joined session");
    }

    fn on_message(&self, _conn: &ConnectionHandle, payload: &[u8]) -> bool {
        if let Err(error) = console::print_payload(payload) {
            debug!(%error, "failed to print message");
        }
        true
    }

    fn on_closed(&self, _conn: &ConnectionHandle, error: Option<&TransportError>) {
        if error.is_some() {
            println!("Disconnected from session by host.");
        }
    }
}
