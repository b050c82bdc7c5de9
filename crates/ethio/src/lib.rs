//! Ethernet I/O controller link.
//!
//! One blocking session per physical driver desk: a dedicated thread reads
//! CRLF-terminated JSON command lines from the controller, dispatches them
//! into the simulation's input queue, and mirrors vehicle events and
//! status changes back over the same socket. A transport failure pauses
//! the simulation and the session reconnects on a fixed interval until the
//! controller answers again.

pub mod config;
pub mod dispatch;
pub mod session;

pub use config::EthioConfig;
pub use session::EthioSession;
