use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, info, warn};

use crate::{
    application::Application,
    connection::ConnectionHandle,
    console,
    error::TransportError,
    registry::ConnectionId,
};

const JOIN_NOTICE: &str = "Client connected.";
const LEAVE_NOTICE: &str = "Client disconnected.";

/// Broadcast room: every payload is relayed to every other member.
#[derive(Default)]
pub struct ChatRoom {
    members: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ChatRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections currently in the room, in ascending id order.
    pub fn members(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.lock_members().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock_members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_members().is_empty()
    }

    fn lock_members(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn others(&self, sender: ConnectionId) -> Vec<ConnectionHandle> {
        self.lock_members()
            .iter()
            .filter(|(id, _)| **id != sender)
            .map(|(_, conn)| conn.clone())
            .collect()
    }
}

impl Application for ChatRoom {
    fn on_connected(&self, conn: &ConnectionHandle) {
        self.lock_members().insert(conn.id(), conn.clone());
        info!(id = %conn.id(), peer = ?conn.peer_addr(), "client connected");
        announce(JOIN_NOTICE);
    }

    fn on_message(&self, conn: &ConnectionHandle, payload: &[u8]) -> bool {
        if let Err(error) = console::print_payload(payload) {
            debug!(%error, "failed to echo message");
        }

        // Writes happen outside the member lock.
        for other in self.others(conn.id()) {
            if let Err(error) = other.write(payload) {
                debug!(id = %other.id(), %error, "skipping closed member");
            }
        }
        true
    }

    fn on_write_error(&self, conn: &ConnectionHandle, error: &TransportError, payload: &[u8]) {
        warn!(id = %conn.id(), %error, bytes = payload.len(), "failed to relay message");
    }

    fn on_closed(&self, conn: &ConnectionHandle, error: Option<&TransportError>) {
        self.lock_members().remove(&conn.id());
        match error {
            Some(error) => info!(id = %conn.id(), %error, "client disconnected"),
            None => info!(id = %conn.id(), "client disconnected"),
        }
        announce(LEAVE_NOTICE);
    }
}

// Membership notices share stdout with the relayed payloads.
fn announce(notice: &str) {
    if let Err(error) = console::print_payload(notice.as_bytes()) {
        debug!(%error, "failed to print notice");
    }
}
