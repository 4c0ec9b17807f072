//! Live connections, keyed by a stable identifier.
//!
//! A [`crate::ConnectionHandle`] holds only a [`ConnectionId`] and the registry
//! it was issued by. Writes and closes look the connection up here, so a
//! handle that outlives its connection fails with
//! [`crate::TransportError::Closed`] instead of touching a dead socket. An entry
//! is removed by the connection's own task once teardown has finished.

use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::{mpsc, watch};

use crate::connection::Outbound;

/// Identifier of one connection, unique within its [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct Entry {
    pub(crate) outbound: mpsc::UnboundedSender<Outbound>,
    pub(crate) closed: watch::Receiver<bool>,
    pub(crate) peer: Option<SocketAddr>,
}

pub struct Registry {
    next_id: AtomicU64,
    entries: RwLock<HashMap<ConnectionId, Entry>>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(HashMap::new()),
        })
    }

    pub(crate) fn allocate_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, id: ConnectionId, entry: Entry) {
        self.write().insert(id, entry);
    }

    pub(crate) fn remove(&self, id: ConnectionId) {
        self.write().remove(&id);
    }

    pub(crate) fn with_entry<R>(&self, id: ConnectionId, f: impl FnOnce(&Entry) -> R) -> Option<R> {
        self.read().get(&id).map(f)
    }

    /// Number of connections that have not finished teardown.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.read().contains_key(&id)
    }

    /// Identifiers of every registered connection, in ascending order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnectionId, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
