//! Peer message definitions.
//!
//! These logical messages are wrapped by the length-prefix envelope in
//! `frame.rs`. This module only declares data structures; no I/O logic.
//!
//! Versioning: [`Message::Hello`] carries the sender's protocol version.
//! Evolve the enum by appending variants only — the bincode discriminator
//! is positional.

use serde::{Deserialize, Serialize};

/// Kinematic + control snapshot for one vehicle, broadcast by the instance
/// that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Stable vehicle identifier within the running scenario.
    pub id: u32,
    /// World position, meters.
    pub position: [f64; 3],
    /// Forward velocity, m/s. Negative when running in reverse.
    pub velocity: f64,
    /// Master controller notch currently applied.
    pub master_controller: i8,
    /// Reverser position: -1 backward, 0 neutral, 1 forward.
    pub reverser: i8,
    /// Train brake application, 0.0 (released) ..= 1.0 (emergency).
    pub brake_level: f64,
}

/// Messages exchanged between simulation instances and external peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// First message on a fresh link.
    Hello { version: u16, name: String },
    /// Positive reply to `Hello`; assigns the peer its id for this run.
    Welcome { peer_id: u32, version: u16 },
    /// Simulation clock broadcast; keeps peers in step.
    ClockSync { seconds: f64, paused: bool },
    /// State snapshot for one vehicle.
    VehicleUpdate(VehicleState),
    /// A named scenery event fired, with the id of the activating vehicle.
    SceneryEvent { name: String, activator: u32 },
    /// Ask the receiving instance to fire a scenery event.
    EventRequest { request_id: u32, name: String },
    /// Outcome of an `EventRequest`.
    Ack { request_id: u32, ok: bool },
}

impl Message {
    /// Stable short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "hello",
            Message::Welcome { .. } => "welcome",
            Message::ClockSync { .. } => "clock_sync",
            Message::VehicleUpdate(_) => "vehicle_update",
            Message::SceneryEvent { .. } => "scenery_event",
            Message::EventRequest { .. } => "event_request",
            Message::Ack { .. } => "ack",
        }
    }

    /// Convenience constructor for the link-opening message.
    pub fn hello(name: impl Into<String>) -> Self {
        Message::Hello {
            version: crate::PROTOCOL_VERSION,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_hello() {
        let m = Message::hello("driver-desk");
        let bin = bincode::serialize(&m).expect("serialize");
        let de: Message = bincode::deserialize(&bin).expect("deserialize");
        assert_eq!(de, m);
    }

    #[test]
    fn roundtrip_vehicle_update() {
        let m = Message::VehicleUpdate(VehicleState {
            id: 7,
            position: [120.5, 0.0, -34.25],
            velocity: 17.4,
            master_controller: 3,
            reverser: 1,
            brake_level: 0.2,
        });
        let bin = bincode::serialize(&m).expect("serialize");
        let de: Message = bincode::deserialize(&bin).expect("deserialize");
        assert_eq!(de, m);
    }

    #[test]
    fn kind_labels_unique() {
        use std::collections::HashSet;
        let samples = [
            Message::hello("x"),
            Message::Welcome {
                peer_id: 1,
                version: 1,
            },
            Message::ClockSync {
                seconds: 0.0,
                paused: false,
            },
            Message::VehicleUpdate(VehicleState {
                id: 0,
                position: [0.0; 3],
                velocity: 0.0,
                master_controller: 0,
                reverser: 0,
                brake_level: 0.0,
            }),
            Message::SceneryEvent {
                name: "sw3".into(),
                activator: 0,
            },
            Message::EventRequest {
                request_id: 1,
                name: "sw3".into(),
            },
            Message::Ack {
                request_id: 1,
                ok: true,
            },
        ];
        let mut seen = HashSet::new();
        for m in &samples {
            assert!(seen.insert(m.kind()), "duplicate label {}", m.kind());
        }
    }
}
