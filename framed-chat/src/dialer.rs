use std::{io, net::SocketAddr, sync::Arc};

use dns_lookup::{AddrInfoHints, SockType, getaddrinfo};
use tokio::{
    net::{TcpStream, lookup_host},
    sync::oneshot,
    task,
};
use tracing::{debug, info};

use crate::{
    application::Application,
    connection::{Connection, ConnectionHandle},
    error::DialError,
    registry::Registry,
};

/// Opens a single outbound connection bound to an [`Application`].
pub struct Dialer {
    application: Arc<dyn Application>,
    registry: Arc<Registry>,
}

impl Dialer {
    pub fn new(application: Arc<dyn Application>) -> Self {
        Self {
            application,
            registry: Registry::new(),
        }
    }

    /// Registry that will hold the dialed connection.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Resolves `host`/`service` and connects to the first endpoint that
    /// accepts, trying them in resolution order. `service` is either a port
    /// number or a service name known to the system (`http`, `ssh`, ...).
    ///
    /// On success the connection is already started: `on_connected` has run by
    /// the time the handle is returned.
    pub async fn connect(self, host: &str, service: &str) -> Result<ConnectionHandle, DialError> {
        let port = resolve_service(service).await?;
        let stream = open_stream(host, port).await?;
        let connection = Connection::new(stream, self.application, self.registry);
        info!(id = %connection.id(), host, port, "connected");
        Ok(connection.start())
    }

    /// Dials on a background task and reports the outcome through a one-shot
    /// channel, for callers that collect the handle from elsewhere.
    pub fn spawn(self, host: String, service: String) -> PendingConnection {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = self.connect(&host, &service).await;
            if let Err(error) = &result {
                debug!(%error, "dial failed");
            }
            let _ = tx.send(result);
        });
        PendingConnection { rx }
    }
}

/// Outcome of [`Dialer::spawn`], delivered exactly once.
pub struct PendingConnection {
    rx: oneshot::Receiver<Result<ConnectionHandle, DialError>>,
}

impl PendingConnection {
    pub async fn wait(self) -> Result<ConnectionHandle, DialError> {
        self.rx.await.unwrap_or(Err(DialError::Abandoned))
    }

    /// Blocking variant of [`PendingConnection::wait`] for plain threads
    /// handed the dial result by the runtime. Panics if called from within an
    /// async context.
    pub fn blocking_wait(self) -> Result<ConnectionHandle, DialError> {
        self.rx.blocking_recv().unwrap_or(Err(DialError::Abandoned))
    }
}

/// Maps `service` to a TCP port. Numbers are taken as they are; anything else
/// goes through the system services database on the blocking pool.
async fn resolve_service(service: &str) -> Result<u16, DialError> {
    let invalid = || DialError::InvalidService(service.to_string());

    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    // Out-of-range numbers would otherwise be truncated by the resolver.
    if service.is_empty() || service.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let name = service.to_string();
    match task::spawn_blocking(move || lookup_service_port(&name)).await {
        Ok(Some(port)) => {
            debug!(service, port, "resolved service name");
            Ok(port)
        }
        _ => Err(invalid()),
    }
}

fn lookup_service_port(service: &str) -> Option<u16> {
    let hints = AddrInfoHints {
        socktype: SockType::Stream.into(),
        ..AddrInfoHints::default()
    };
    getaddrinfo(None, Some(service), Some(hints))
        .ok()?
        .filter_map(Result::ok)
        .map(|info| info.sockaddr.port())
        .next()
}

async fn open_stream(host: &str, port: u16) -> Result<TcpStream, DialError> {
    let endpoints: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|source| DialError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    let mut last_error: Option<io::Error> = None;
    for endpoint in endpoints {
        match TcpStream::connect(endpoint).await {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(%endpoint, %error, "endpoint refused connection");
                last_error = Some(error);
            }
        }
    }

    Err(match last_error {
        Some(source) => DialError::Connect {
            host: host.to_string(),
            port,
            source,
        },
        None => DialError::NoAddresses {
            host: host.to_string(),
        },
    })
}
