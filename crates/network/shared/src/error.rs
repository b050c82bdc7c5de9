//! Error vocabulary shared across the messaging layer.
//!
//! Four kinds with distinct recovery rules:
//! - [`TransportError`] — connect/socket failures; the blocking sessions
//!   answer with their reconnect loop, the async backend disconnects.
//! - [`FormatError`] — malformed frames or lines; fatal for an async
//!   connection, a dropped frame for the blocking sessions.
//! - [`ProtocolError`] — well-formed but unrecognized content; never fatal.
//! - [`CapacityError`] — send-side refusals; aborts that single send.

use thiserror::Error;

/// Transport-level failure: connect error, socket error, receive timeout.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("receive timed out")]
    Timeout,
    #[error("connection closed by peer")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not connected")]
    NotConnected,
}

impl TransportError {
    /// Classify a socket read error, folding the platform-specific timeout
    /// kinds into [`TransportError::Timeout`].
    pub fn from_read(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(err),
        }
    }
}

/// A frame or line that could not be decoded, or a header that must not be
/// followed by a body read.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("short header: expected {expected} bytes, got {got}")]
    ShortHeader { expected: usize, got: usize },
    #[error("bad frame magic {0:#010x}")]
    BadMagic(u32),
    #[error("frame length {len} exceeds limit {max}")]
    Oversize { len: u32, max: u32 },
    #[error("message decode failed: {0}")]
    Decode(#[source] bincode::Error),
    #[error("{excess} trailing bytes after message body")]
    TrailingBytes { excess: usize },
    #[error("line exceeds {max} bytes")]
    LineOverflow { max: usize },
    #[error("malformed json line: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected json type for member `{member}`")]
    WrongValueType { member: &'static str },
}

/// Well-formed input the dispatch layer does not recognize. Logged and
/// ignored; the receive loop always continues.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("bad value {value} for command `{command}`")]
    BadValue { command: &'static str, value: f64 },
}

/// Send-side refusal: the message was never written to the socket.
#[derive(Debug, Error)]
pub enum CapacityError {
    #[error("encoded message size {size} exceeds limit {max}")]
    Oversize { size: usize, max: u32 },
    #[error("message serialization failed: {0}")]
    Serialize(#[source] bincode::Error),
}
