//! Vehicle-originated event notifications.
//!
//! A bound vehicle notifies its subscribers when the driver moves the
//! reverser or switches the cab lights, so an external controller can
//! mirror the physical desk. Subscription is explicit: a link subscribes
//! when a vehicle is bound to it and unsubscribes when the binding ends.

use std::sync::{Arc, Mutex, Weak};

/// Callback interface implemented by links that mirror vehicle state.
pub trait TrainObserver: Send + Sync {
    fn on_reverser_changed(&self, position: i32);
    fn on_interior_light_changed(&self, state: i32);
    fn on_instrument_light_changed(&self, state: i32);
}

/// Event source owned by a train object. Holds subscribers weakly so a
/// dropped link never keeps a dead observer alive.
#[derive(Default)]
pub struct TrainEvents {
    observers: Mutex<Vec<Weak<dyn TrainObserver>>>,
}

impl TrainEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Weak<dyn TrainObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        observers.push(observer);
    }

    pub fn unsubscribe(&self, observer: &Weak<dyn TrainObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        observers.retain(|o| !o.ptr_eq(observer) && o.strong_count() > 0);
    }

    pub fn reverser_changed(&self, position: i32) {
        self.notify(|o| o.on_reverser_changed(position));
    }

    pub fn interior_light_changed(&self, state: i32) {
        self.notify(|o| o.on_interior_light_changed(state));
    }

    pub fn instrument_light_changed(&self, state: i32) {
        self.notify(|o| o.on_instrument_light_changed(state));
    }

    fn notify(&self, f: impl Fn(&Arc<dyn TrainObserver>)) {
        let observers: Vec<Arc<dyn TrainObserver>> = {
            let mut guard = self.observers.lock().unwrap_or_else(|e| e.into_inner());
            guard.retain(|o| o.strong_count() > 0);
            guard.iter().filter_map(|o| o.upgrade()).collect()
        };
        for observer in &observers {
            f(observer);
        }
    }
}
