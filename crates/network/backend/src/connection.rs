//! One framed TCP connection.
//!
//! Lifecycle: constructed around a freshly connected or accepted socket,
//! reading stays unarmed until the owner calls [`Connection::connected`].
//! From then on the read task alternates between one header read and one
//! body read — strictly sequential framing, never more than one read in
//! flight. Any framing violation (short read, foreign magic, oversized or
//! inexact body) tears the connection down; [`Connection::disconnect`] is
//! terminal and idempotent.
//!
//! All mutation happens on the connection's own read/write tasks, which is
//! the per-connection serialization point in a pooled runtime.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use network_shared::error::CapacityError;
use network_shared::frame::{self, HEADER_LEN};
use network_shared::message::Message;

/// Callback invoked with every decoded inbound message. The message is
/// handed over by value; the connection reference allows addressing a
/// reply to the sender.
pub type MessageHandler = Arc<dyn Fn(&Arc<Connection>, Message) + Send + Sync>;

/// Hook fired exactly once when the connection goes down, however it goes
/// down. The server uses it to prune its live set.
pub(crate) type DisconnectHook = Box<dyn Fn() + Send + Sync>;

pub struct Connection {
    peer: SocketAddr,
    is_client: bool,
    open: AtomicBool,
    shutdown: CancellationToken,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    reader: Mutex<Option<OwnedReadHalf>>,
    handler: OnceLock<MessageHandler>,
    on_disconnect: OnceLock<DisconnectHook>,
}

impl Connection {
    /// Wrap an established socket. The writer task starts immediately;
    /// reading waits for [`Connection::connected`].
    pub(crate) fn new(stream: TcpStream, is_client: bool) -> Arc<Self> {
        let peer = stream
            .peer_addr()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let conn = Arc::new(Self {
            peer,
            is_client,
            open: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            outbound,
            reader: Mutex::new(Some(read_half)),
            handler: OnceLock::new(),
            on_disconnect: OnceLock::new(),
        });
        Self::spawn_writer(Arc::clone(&conn), outbound_rx, write_half);
        conn
    }

    /// Install the owner's message callback. Set once; later calls are
    /// ignored.
    pub fn set_handler(&self, handler: MessageHandler) {
        if self.handler.set(handler).is_err() {
            debug!(target: "net::tcp", peer = %self.peer, "message handler already set");
        }
    }

    pub(crate) fn set_disconnect_hook(&self, hook: DisconnectHook) {
        let _ = self.on_disconnect.set(hook);
    }

    /// The transport handshake finished; arm the first header read.
    pub fn connected(self: Arc<Self>) {
        let reader = self.reader.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut reader) = reader else {
            debug!(target: "net::tcp", peer = %self.peer, "read loop already armed");
            return;
        };
        tokio::spawn(async move {
            Self::read_loop(&self, &mut reader).await;
            self.disconnect();
        });
    }

    /// Encode and queue one message. Write completion is asynchronous; a
    /// failed or short write tears the connection down from the writer
    /// task. An oversized message is refused here and never transmitted.
    pub fn send_message(&self, message: &Message) -> Result<(), CapacityError> {
        let encoded = frame::encode(message)?;
        if !self.is_open() || self.outbound.send(encoded).is_err() {
            debug!(target: "net::tcp", peer = %self.peer, "send on closed connection dropped");
        }
        Ok(())
    }

    /// Terminal: close the socket and stop both tasks. Safe to call any
    /// number of times; the disconnect hook fires once.
    pub fn disconnect(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.shutdown.cancel();
            debug!(target: "net::tcp", peer = %self.peer, "connection closed");
            if let Some(hook) = self.on_disconnect.get() {
                hook();
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// True for the connecting side, false for a server-accepted socket.
    pub fn is_client(&self) -> bool {
        self.is_client
    }

    /// Header/body read cycle. Returning from here (for any reason) ends
    /// the connection; the caller invokes `disconnect`.
    async fn read_loop(conn: &Arc<Self>, reader: &mut OwnedReadHalf) {
        let mut header = [0u8; HEADER_LEN];
        loop {
            tokio::select! {
                _ = conn.shutdown.cancelled() => return,
                read = reader.read_exact(&mut header) => {
                    if let Err(e) = read {
                        debug!(target: "net::tcp", peer = %conn.peer, "header read ended: {e}");
                        return;
                    }
                }
            }

            let length = match frame::read_header(&header) {
                Ok(length) => length as usize,
                Err(e) => {
                    warn!(target: "net::tcp", peer = %conn.peer, "dropping connection: {e}");
                    return;
                }
            };

            let mut body = vec![0u8; length];
            tokio::select! {
                _ = conn.shutdown.cancelled() => return,
                read = reader.read_exact(&mut body) => {
                    if let Err(e) = read {
                        warn!(target: "net::tcp", peer = %conn.peer, "body read ended: {e}");
                        return;
                    }
                }
            }

            match frame::decode_body(&body) {
                Ok(message) => {
                    if let Some(handler) = conn.handler.get() {
                        handler(conn, message);
                    }
                }
                Err(e) => {
                    warn!(target: "net::tcp", peer = %conn.peer, "dropping connection: {e}");
                    return;
                }
            }
        }
    }

    fn spawn_writer(
        conn: Arc<Self>,
        mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
        mut writer: OwnedWriteHalf,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = conn.shutdown.cancelled() => break,
                    buffer = outbound.recv() => {
                        let Some(buffer) = buffer else { break };
                        // write_all surfaces short writes as errors; both
                        // escalate to the same teardown as a short read.
                        if let Err(e) = writer.write_all(&buffer).await {
                            warn!(target: "net::tcp", peer = %conn.peer, "write failed, dropping connection: {e}");
                            conn.disconnect();
                            break;
                        }
                    }
                }
            }
            let _ = writer.shutdown().await;
        });
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("is_client", &self.is_client)
            .field("open", &self.is_open())
            .finish()
    }
}
