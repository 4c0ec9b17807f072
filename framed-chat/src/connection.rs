//! One socket bound to an [`Application`].
//!
//! A started connection runs on its own task, which polls two halves:
//!
//! - the reader loops `header → body → on_message` with exactly one read in
//!   flight. A sentinel header, or `on_message` returning `false`, ends it
//!   without an error;
//! - the writer drains an unbounded FIFO of encoded frames, one `write_all` at
//!   a time, so frames from concurrent [`ConnectionHandle::write`] callers are
//!   never interleaved.
//!
//! Whichever half finishes first decides how the connection closes. The other
//! half is dropped, `on_closed` runs once, the socket is released and only then
//! is the connection removed from its [`Registry`].

use std::{fmt, io, net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    select,
    sync::{mpsc, watch},
};
use tracing::{debug, trace};

use crate::{
    application::Application,
    error::TransportError,
    header::{self, HEADER_LEN, SENTINEL},
    registry::{ConnectionId, Entry, Registry},
};

pub(crate) enum Outbound {
    Frame(Vec<u8>),
    Close,
}

/// Cheap, cloneable reference to a connection.
///
/// Handles stay valid after the connection is gone; operations on them then
/// fail with [`TransportError::Closed`].
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    registry: Arc<Registry>,
}

impl ConnectionHandle {
    pub(crate) fn from_parts(id: ConnectionId, registry: Arc<Registry>) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.registry.with_entry(self.id, |entry| entry.peer).flatten()
    }

    /// Whether the connection still accepts writes.
    pub fn is_open(&self) -> bool {
        self.registry
            .with_entry(self.id, |entry| !entry.outbound.is_closed())
            .unwrap_or(false)
    }

    /// Queues `payload` as one frame behind everything already queued.
    ///
    /// Never blocks and may be called from any thread, including from inside
    /// another connection's hooks. The queue is unbounded.
    pub fn write(&self, payload: impl AsRef<[u8]>) -> Result<(), TransportError> {
        self.enqueue(Outbound::Frame(header::frame(payload.as_ref())))
    }

    /// Closes the connection once the frames queued before this call are
    /// written. Closing an already closed connection does nothing.
    pub fn close(&self) {
        if self.enqueue(Outbound::Close).is_err() {
            trace!(id = %self.id, "close requested on a closed connection");
        }
    }

    /// Resolves once the connection has been torn down.
    pub async fn closed(&self) {
        let Some(mut closed) = self.registry.with_entry(self.id, |entry| entry.closed.clone())
        else {
            return;
        };
        let _ = closed.wait_for(|closed| *closed).await;
    }

    fn enqueue(&self, outbound: Outbound) -> Result<(), TransportError> {
        let sent = self
            .registry
            .with_entry(self.id, |entry| entry.outbound.send(outbound).is_ok());
        match sent {
            Some(true) => Ok(()),
            _ => Err(TransportError::Closed(self.id)),
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle").field("id", &self.id).finish()
    }
}

/// A socket that has not started exchanging frames yet.
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    application: Arc<dyn Application>,
    registry: Arc<Registry>,
}

impl Connection {
    pub fn new(stream: TcpStream, application: Arc<dyn Application>, registry: Arc<Registry>) -> Self {
        let id = registry.allocate_id();
        Self {
            id,
            stream,
            application,
            registry,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Registers the connection, runs `on_connected` on the caller's task and
    /// spawns the read/write task. Must be called inside a tokio runtime.
    pub fn start(self) -> ConnectionHandle {
        let Connection {
            id,
            stream,
            application,
            registry,
        } = self;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        registry.insert(
            id,
            Entry {
                outbound: outbound_tx,
                closed: closed_rx,
                peer: stream.peer_addr().ok(),
            },
        );

        let handle = ConnectionHandle::from_parts(id, registry);
        application.on_connected(&handle);
        tokio::spawn(drive(
            stream,
            handle.clone(),
            application,
            outbound_rx,
            closed_tx,
        ));
        handle
    }
}

async fn drive(
    stream: TcpStream,
    conn: ConnectionHandle,
    application: Arc<dyn Application>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    closed: watch::Sender<bool>,
) {
    let (mut reader, mut writer) = stream.into_split();

    let outcome = select! {
        outcome = read_frames(&mut reader, &conn, application.as_ref()) => outcome,
        outcome = write_frames(&mut writer, &mut outbound, &conn, application.as_ref()) => outcome,
    };
    // Later writes fail fast with `Closed`.
    drop(outbound);

    let error = outcome.err();
    match &error {
        Some(error) => debug!(id = %conn.id, %error, "connection closed with error"),
        None => debug!(id = %conn.id, "connection closed"),
    }
    application.on_closed(&conn, error.as_ref());

    drop(reader);
    drop(writer);
    closed.send_replace(true);
    conn.registry.remove(conn.id);
}

pub(crate) async fn read_frames<R>(
    reader: &mut R,
    conn: &ConnectionHandle,
    application: &dyn Application,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut body = Vec::new();

    loop {
        reader.read_exact(&mut header).await?;
        let length = header::decode(&header);
        if length == SENTINEL {
            debug!(id = %conn.id, "peer sent end-of-stream header");
            return Ok(());
        }

        // The body grows as bytes arrive rather than trusting the announced size.
        body.clear();
        let received = (&mut *reader).take(length).read_to_end(&mut body).await?;
        if (received as u64) < length {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        trace!(id = %conn.id, bytes = body.len(), "received frame");
        if !application.on_message(conn, &body) {
            return Ok(());
        }
    }
}

pub(crate) async fn write_frames<W>(
    writer: &mut W,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    conn: &ConnectionHandle,
    application: &dyn Application,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(next) = outbound.recv().await {
        let frame = match next {
            Outbound::Frame(frame) => frame,
            Outbound::Close => {
                debug!(id = %conn.id, "close requested");
                return Ok(());
            }
        };

        if let Err(error) = write_frame(writer, &frame).await {
            let error = TransportError::from(error);
            application.on_write_error(conn, &error, &frame[HEADER_LEN..]);
            return Err(error);
        }
    }
    Ok(())
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::io::duplex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<Vec<u8>>>,
        write_errors: Mutex<Vec<Vec<u8>>>,
    }

    impl Application for Recorder {
        fn on_connected(&self, _conn: &ConnectionHandle) {}

        fn on_message(&self, _conn: &ConnectionHandle, payload: &[u8]) -> bool {
            self.messages.lock().unwrap().push(payload.to_vec());
            payload != b"stop"
        }

        fn on_write_error(&self, _conn: &ConnectionHandle, _error: &TransportError, payload: &[u8]) {
            self.write_errors.lock().unwrap().push(payload.to_vec());
        }

        fn on_closed(&self, _conn: &ConnectionHandle, _error: Option<&TransportError>) {}
    }

    fn detached_handle() -> ConnectionHandle {
        let registry = Registry::new();
        ConnectionHandle::from_parts(registry.allocate_id(), registry)
    }

    #[tokio::test]
    async fn reader_dispatches_frames_until_sentinel() {
        let (mut peer, mut local) = duplex(4096);
        let mut wire = Vec::new();
        wire.extend(header::frame(b"hello"));
        wire.extend(header::frame(b""));
        wire.extend(header::frame(&[7u8; 300]));
        wire.extend(header::encode(SENTINEL));
        wire.extend(header::frame(b"never read"));
        peer.write_all(&wire).await.unwrap();

        let app = Recorder::default();
        let outcome = read_frames(&mut local, &detached_handle(), &app).await;

        assert!(outcome.is_ok());
        let messages = app.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], b"hello");
        assert!(messages[1].is_empty());
        assert_eq!(messages[2], vec![7u8; 300]);
    }

    #[tokio::test]
    async fn reader_stops_when_application_declines() {
        let (mut peer, mut local) = duplex(4096);
        let mut wire = header::frame(b"stop");
        wire.extend(header::frame(b"after"));
        peer.write_all(&wire).await.unwrap();

        let app = Recorder::default();
        let outcome = read_frames(&mut local, &detached_handle(), &app).await;

        assert!(outcome.is_ok());
        assert_eq!(*app.messages.lock().unwrap(), vec![b"stop".to_vec()]);
    }

    #[tokio::test]
    async fn reader_reports_truncated_body() {
        let (mut peer, mut local) = duplex(4096);
        peer.write_all(&header::encode(10)).await.unwrap();
        peer.write_all(b"abc").await.unwrap();
        drop(peer);

        let app = Recorder::default();
        let outcome = read_frames(&mut local, &detached_handle(), &app).await;

        match outcome {
            Err(TransportError::Io(error)) => {
                assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected unexpected eof, got {other:?}"),
        }
        assert!(app.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn writer_drains_queue_in_order_then_honours_close() {
        let (mut local, mut peer) = duplex(4096);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Outbound::Frame(header::frame(b"one"))).unwrap();
        tx.send(Outbound::Frame(header::frame(b"two"))).unwrap();
        tx.send(Outbound::Close).unwrap();
        tx.send(Outbound::Frame(header::frame(b"dropped"))).unwrap();

        let app = Recorder::default();
        let outcome = write_frames(&mut local, &mut rx, &detached_handle(), &app).await;
        assert!(outcome.is_ok());
        drop(local);

        let mut written = Vec::new();
        peer.read_to_end(&mut written).await.unwrap();
        let mut expected = header::frame(b"one");
        expected.extend(header::frame(b"two"));
        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn writer_reports_failed_payload() {
        let (mut local, peer) = duplex(64);
        drop(peer);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Outbound::Frame(header::frame(b"lost"))).unwrap();

        let app = Recorder::default();
        let outcome = write_frames(&mut local, &mut rx, &detached_handle(), &app).await;

        assert!(matches!(outcome, Err(TransportError::Io(_))));
        assert_eq!(*app.write_errors.lock().unwrap(), vec![b"lost".to_vec()]);
    }

    #[test]
    fn detached_handle_rejects_writes() {
        let conn = detached_handle();
        assert!(!conn.is_open());
        assert!(matches!(conn.write("hi"), Err(TransportError::Closed(id)) if id == conn.id()));
        conn.close();
    }
}
