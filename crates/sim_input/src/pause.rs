//! Per-cause pause bookkeeping.
//!
//! Several subsystems can hold the simulation paused at once (a controller
//! link mid-reconnect, the UI, a peer request). Each holds its own bit, so
//! one subsystem clearing its cause never clobbers another's. The
//! simulation is paused while any bit is set.

use std::sync::atomic::{AtomicU32, Ordering};

/// Subsystems that may hold the simulation paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PauseCause {
    Ui = 0,
    ControllerLink = 1,
    Recorder = 2,
    Peer = 3,
}

impl PauseCause {
    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Shared pause state, one bit per cause.
#[derive(Debug, Default)]
pub struct PauseRegistry {
    causes: AtomicU32,
}

impl PauseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert `cause`. Idempotent.
    pub fn assert_cause(&self, cause: PauseCause) {
        self.causes.fetch_or(cause.bit(), Ordering::AcqRel);
    }

    /// Clear `cause`. Other causes stay untouched.
    pub fn clear_cause(&self, cause: PauseCause) {
        self.causes.fetch_and(!cause.bit(), Ordering::AcqRel);
    }

    /// True while any cause is held.
    pub fn is_paused(&self) -> bool {
        self.causes.load(Ordering::Acquire) != 0
    }

    /// True while `cause` specifically is held.
    pub fn holds(&self, cause: PauseCause) -> bool {
        self.causes.load(Ordering::Acquire) & cause.bit() != 0
    }
}
