//! Asynchronous TCP peer backend.
//!
//! Reactor-model counterpart to the blocking controller links: a tokio
//! runtime drives all socket I/O through per-connection tasks. Wire format
//! and message types come from `network_shared`; this crate owns the
//! sockets and the connection lifecycle.
//!
//! Error discipline differs from the blocking sessions on purpose: any
//! transport or framing problem is terminal for the affected connection
//! (no automatic reconnect), and the owner is expected to discard it.

use std::io;
use std::net::SocketAddr;

use network_shared::error::TransportError;

pub mod client;
pub mod connection;
pub mod server;

pub use client::Client;
pub use connection::{Connection, MessageHandler};
pub use server::Server;

/// Resolve `(host, port)` to the first usable socket address.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(TransportError::Connect)?;
    addrs.next().ok_or_else(|| {
        TransportError::Connect(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {host}"),
        ))
    })
}
