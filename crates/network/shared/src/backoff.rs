//! Cancellable fixed-interval wait.
//!
//! The blocking links sleep a fixed interval between reconnect attempts.
//! A plain sleep would make shutdown wait out the full interval, so the
//! wait is a condvar with timeout that a cancel wakes immediately.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct BackoffGate {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl BackoffGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait out one backoff interval. Returns `false` when the gate was
    /// cancelled before or during the wait.
    pub fn wait(&self, interval: Duration) -> bool {
        let guard = self.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _timeout) = self
            .condvar
            .wait_timeout_while(guard, interval, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        !*guard
    }

    /// Wake every waiter and make all future waits return immediately.
    pub fn cancel(&self) {
        let mut cancelled = self.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn wait_runs_to_completion_without_cancel() {
        let gate = BackoffGate::new();
        let started = Instant::now();
        assert!(gate.wait(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn cancel_wakes_a_waiting_thread() {
        let gate = Arc::new(BackoffGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.wait(Duration::from_secs(30)))
        };
        std::thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        gate.cancel();
        let completed = waiter.join().expect("join");
        assert!(!completed, "cancelled wait reports cancellation");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn cancelled_gate_never_waits_again() {
        let gate = BackoffGate::new();
        gate.cancel();
        let started = Instant::now();
        assert!(!gate.wait(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
