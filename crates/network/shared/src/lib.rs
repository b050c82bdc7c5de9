//! Shared wire-level types for the simulation's messaging layer.
//!
//! This crate hosts the protocol primitives used by both the asynchronous
//! peer backend and the blocking controller links:
//! - wire: big-endian u32 load/store helpers
//! - frame: the magic + length binary envelope around [`message::Message`]
//! - line: CRLF-terminated JSON line framing for the controller protocols
//! - error: the error vocabulary shared across all transports
//! - backoff: the cancellable reconnect wait used by the blocking links
//!
//! Keep this crate free of sockets; the codecs operate on byte slices so
//! they stay testable without I/O.

pub mod backoff;
pub mod error;
pub mod frame;
pub mod line;
pub mod message;
pub mod wire;

/// Protocol version advertised in [`message::Message::Hello`].
pub const PROTOCOL_VERSION: u16 = 1;

/// Convenience prelude for downstream crates.
pub mod prelude {
    pub use crate::PROTOCOL_VERSION;
    pub use crate::error::{CapacityError, FormatError, ProtocolError, TransportError};
    pub use crate::frame::{FRAME_MAGIC, HEADER_LEN, MAX_MSG_SIZE};
    pub use crate::line::{InboundLine, LineAccumulator};
    pub use crate::message::Message;
}
