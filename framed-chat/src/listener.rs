use std::{future::Future, io, net::SocketAddr, sync::Arc};

use tokio::{
    net::{TcpListener, TcpStream, ToSocketAddrs},
    select,
};
use tracing::{info, warn};

use crate::{
    application::Application,
    connection::{Connection, ConnectionHandle},
    registry::Registry,
};

/// Accepts sockets and binds each one to a shared [`Application`].
pub struct Listener {
    listener: TcpListener,
    application: Arc<dyn Application>,
    registry: Arc<Registry>,
}

impl Listener {
    pub fn new(listener: TcpListener, application: Arc<dyn Application>) -> Self {
        Self {
            listener,
            application,
            registry: Registry::new(),
        }
    }

    pub async fn bind<A>(addr: A, application: Arc<dyn Application>) -> io::Result<Self>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, application))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Connections accepted by this listener that are still being served.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accepts connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then asks every live
    /// connection to close.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Listener {
            listener,
            application,
            registry,
        } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    handle_shutdown(&registry);
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &application, &registry);
                }
            }
        }
    }

    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_shutdown(registry: &Arc<Registry>) {
    let live = registry.ids();
    info!(connections = live.len(), "listener shutting down");
    for id in live {
        ConnectionHandle::from_parts(id, Arc::clone(registry)).close();
    }
}

// A failed accept is logged and skipped; the loop re-arms either way.
fn handle_accept_result(
    result: io::Result<(TcpStream, SocketAddr)>,
    application: &Arc<dyn Application>,
    registry: &Arc<Registry>,
) {
    match result {
        Ok((stream, peer)) => {
            let connection = Connection::new(stream, Arc::clone(application), Arc::clone(registry));
            info!(id = %connection.id(), %peer, "accepted connection");
            connection.start();
        }
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}
