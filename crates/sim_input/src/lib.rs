//! Simulation-facing collaborator interfaces.
//!
//! The messaging layer never touches vehicle physics or UI state directly;
//! it talks to the simulation through the small surfaces defined here:
//! - command: the user-command vocabulary and the input-event relay
//! - pause: per-cause pause bookkeeping shared by all subsystems
//! - state: readiness/pause snapshot used by the status poll
//! - train: observer interface for vehicle-originated events

pub mod command;
pub mod pause;
pub mod state;
pub mod train;

pub use command::{CommandPhase, CommandRelay, InputEvent, QueueRelay, UserCommand};
pub use pause::{PauseCause, PauseRegistry};
pub use state::SimulationState;
pub use train::{TrainEvents, TrainObserver};
