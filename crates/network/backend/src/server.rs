//! Listening endpoint for peer connections.
//!
//! Accepted sockets are wrapped in [`Connection`]s that share one
//! server-level dispatch callback. The accept loop is self-perpetuating: a
//! failed accept is logged and the next accept is armed regardless, so one
//! bad handshake never stops the server from listening. Connections remove
//! themselves from the live set when they disconnect.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use network_shared::error::TransportError;
use network_shared::message::Message;

use crate::connection::{Connection, MessageHandler};

/// Listen backlog for the server socket.
pub const LISTEN_BACKLOG: u32 = 10;

pub struct Server {
    inner: Arc<ServerInner>,
    local_addr: SocketAddr,
}

struct ServerInner {
    connections: Mutex<Vec<Arc<Connection>>>,
    handler: MessageHandler,
    shutdown: CancellationToken,
}

impl Server {
    /// Bind and listen on `(host, port)` and start accepting. Every
    /// inbound message from any accepted connection is forwarded to
    /// `handler` together with the originating connection.
    pub async fn bind(host: &str, port: u16, handler: MessageHandler) -> Result<Self, TransportError> {
        let addr = crate::resolve(host, port).await?;
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.set_nodelay(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        let local_addr = listener.local_addr()?;

        let inner = Arc::new(ServerInner {
            connections: Mutex::new(Vec::new()),
            handler,
            shutdown: CancellationToken::new(),
        });
        tokio::spawn(accept_loop(listener, Arc::clone(&inner)));
        info!(target: "net::tcp::server", %local_addr, "listening");

        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently live accepted connections.
    pub fn connection_count(&self) -> usize {
        self.inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Send one message to every live connection. Per-connection send
    /// refusals are logged and do not affect the other peers.
    pub fn broadcast(&self, message: &Message) {
        let connections = self
            .inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for conn in connections {
            if let Err(e) = conn.send_message(message) {
                warn!(target: "net::tcp::server", peer = %conn.peer_addr(), "broadcast send refused: {e}");
            }
        }
    }

    /// Stop accepting and disconnect every live connection.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let connections: Vec<_> = self
            .inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for conn in connections {
            conn.disconnect();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop(listener: TcpListener, inner: Arc<ServerInner>) {
    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(target: "net::tcp::server", %peer, "failed to disable nagle: {e}");
                    }
                    let conn = Connection::new(stream, false);
                    conn.set_handler(inner.handler.clone());

                    inner
                        .connections
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(Arc::clone(&conn));

                    let weak_inner = Arc::downgrade(&inner);
                    let weak_conn = Arc::downgrade(&conn);
                    conn.set_disconnect_hook(Box::new(move || {
                        if let (Some(inner), Some(conn)) = (weak_inner.upgrade(), weak_conn.upgrade()) {
                            inner
                                .connections
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .retain(|c| !Arc::ptr_eq(c, &conn));
                        }
                    }));

                    conn.connected();
                    debug!(target: "net::tcp::server", %peer, "client connected");
                }
                Err(e) => {
                    // Keep listening; one failed accept must not stop the server.
                    warn!(target: "net::tcp::server", "failed to accept client: {e}");
                }
            }
        }
    }
}
