//! Readiness and pause snapshot shared with the external links.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::pause::PauseRegistry;

/// The slice of global simulation state the messaging layer may observe and
/// (through the pause registry) influence.
#[derive(Debug, Default)]
pub struct SimulationState {
    ready: AtomicBool,
    pub pause: PauseRegistry,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set once scenario loading finishes.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
