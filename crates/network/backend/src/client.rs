//! Outbound peer connection.
//!
//! [`Client::connect`] makes exactly one attempt: a failure is logged and
//! returned, matching the rest of the backend's no-auto-reconnect rule.
//! Callers that want controller-link-style persistence use
//! [`Client::connect_retrying`], which retries on a fixed interval until an
//! explicit stop.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use network_shared::error::{CapacityError, TransportError};
use network_shared::message::Message;

use crate::connection::{Connection, MessageHandler};

pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Resolve the endpoint and connect once. On success the owned
    /// connection is armed and inbound messages flow to `handler`.
    pub async fn connect(host: &str, port: u16, handler: MessageHandler) -> Result<Self, TransportError> {
        let addr = crate::resolve(host, port).await?;
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    warn!(target: "net::tcp::client", %addr, "failed to disable nagle: {e}");
                }
                let conn = Connection::new(stream, true);
                conn.set_handler(handler);
                Arc::clone(&conn).connected();
                info!(target: "net::tcp::client", %addr, "connected");
                Ok(Self { conn })
            }
            Err(e) => {
                error!(target: "net::tcp::client", %addr, "failed to connect: {e}");
                Err(TransportError::Connect(e))
            }
        }
    }

    /// Retry [`Client::connect`] on a fixed interval until it succeeds or
    /// `stop` is cancelled. Cancellation returns the last connect error.
    pub async fn connect_retrying(
        host: &str,
        port: u16,
        handler: MessageHandler,
        retry_interval: Duration,
        stop: CancellationToken,
    ) -> Result<Self, TransportError> {
        loop {
            match Self::connect(host, port, handler.clone()).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    tokio::select! {
                        _ = stop.cancelled() => return Err(e),
                        _ = tokio::time::sleep(retry_interval) => {}
                    }
                }
            }
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub fn send_message(&self, message: &Message) -> Result<(), CapacityError> {
        self.conn.send_message(message)
    }

    pub fn disconnect(&self) {
        self.conn.disconnect();
    }
}
