//! Controller link configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection parameters for one hardware controller, owned by the host
/// application's configuration layer and passed in at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EthioConfig {
    pub enable: bool,
    pub controller_ip: String,
    pub controller_port: u16,
    /// Socket receive timeout, milliseconds. A timed-out receive counts as
    /// a transport failure and triggers the reconnect loop.
    pub receive_timeout_ms: u64,
    /// Fixed wait between reconnect attempts, milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for EthioConfig {
    fn default() -> Self {
        Self {
            enable: false,
            controller_ip: "127.0.0.1".into(),
            controller_port: 5500,
            receive_timeout_ms: 4_000,
            reconnect_delay_ms: 2_000,
        }
    }
}

impl EthioConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
