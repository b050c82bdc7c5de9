//! User-command vocabulary and the input-event relay.
//!
//! [`UserCommand`] covers the subset of the simulation's input vocabulary
//! reachable from external links. Commands are posted through
//! [`CommandRelay`] as discrete press/release events; the simulation drains
//! them from its input queue once per frame.

use serde::{Deserialize, Serialize};

/// Input commands the external links can post into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserCommand {
    HornHighActivate,
    HornLowActivate,
    WhistleActivate,
    AlerterAcknowledge,
    CabSignalAcknowledge,
    RadioToggle,
    RadioStopTest,
    RadioStopSend,
    RadioChannelDecrease,
    RadioChannelIncrease,
    AlarmChainToggle,
    AlarmChainEnable,
    AlarmChainDisable,
    LineBreakerToggle,
    LineBreakerOpen,
    LineBreakerClose,
    TrainBrakeFirstService,
    TrainBrakeFullService,
    TrainBrakeService,
    TrainBrakeEmergency,
    TrainBrakeRelease,
    TrainBrakeSet,
    IndependentBrakeBailOff,
    IndependentBrakeIncrease,
    IndependentBrakeIncreaseFast,
    IndependentBrakeDecrease,
    IndependentBrakeDecreaseFast,
    IndependentBrakeSet,
    ManualBrakeIncrease,
    WheelSpinBrakeActivate,
    SandboxActivate,
    InteriorLightEnable,
    InteriorLightDimDisable,
    InstrumentLightEnable,
    InstrumentLightDisable,
    HeadlightsDimEnable,
    HeadlightsDimDisable,
    ReverserForward,
    ReverserNeutral,
    ReverserBackward,
    PantographToggleFront,
    PantographRaiseFront,
    PantographRaiseRear,
    PantographLowerFront,
    PantographLowerRear,
    MasterControllerSet,
    SecondControllerSet,
    SecondControllerIncrease,
    SecondControllerDecrease,
    BatteryEnable,
    BatteryDisable,
    BatteryToggle,
}

/// Key-style phase of a posted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandPhase {
    Press,
    Release,
}

/// One queued input event as the simulation sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub command: UserCommand,
    pub value1: f64,
    pub value2: f64,
    pub phase: CommandPhase,
    /// Originating input device slot (0 = primary).
    pub device: u8,
}

/// Sink for input events; implemented by the simulation's command queue.
pub trait CommandRelay: Send + Sync {
    fn post(&self, command: UserCommand, value1: f64, value2: f64, phase: CommandPhase, device: u8);
}

/// Channel-backed relay. The simulation side holds the receiver and drains
/// it once per frame; tests use it to observe dispatched events.
pub struct QueueRelay {
    tx: crossbeam_channel::Sender<InputEvent>,
}

impl QueueRelay {
    pub fn new() -> (Self, crossbeam_channel::Receiver<InputEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl CommandRelay for QueueRelay {
    fn post(&self, command: UserCommand, value1: f64, value2: f64, phase: CommandPhase, device: u8) {
        // A closed receiver means the simulation is shutting down; events
        // posted after that point are dropped.
        let _ = self.tx.send(InputEvent {
            command,
            value1,
            value2,
            phase,
            device,
        });
    }
}
