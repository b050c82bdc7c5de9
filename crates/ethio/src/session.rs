//! The blocking controller session.
//!
//! One dedicated receiver thread per session: blocking one-byte reads are
//! fed through a [`LineAccumulator`]; each completed line is parsed as one
//! JSON object and dispatched. A malformed line is dropped and the loop
//! continues; a socket error (receive timeout included) pauses the
//! simulation and enters the reconnect loop — fixed-interval wait, close,
//! connect again — until the controller answers or the session shuts down.
//! The pause is cleared on the first byte received after a reconnect, and
//! only if this session asserted it.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use serde_json::json;
use tracing::{debug, info, warn};

use network_shared::backoff::BackoffGate;
use network_shared::error::TransportError;
use network_shared::line::{self, InboundLine, LineAccumulator};
use sim_input::{CommandRelay, PauseCause, SimulationState, TrainEvents, TrainObserver};

use crate::config::EthioConfig;
use crate::dispatch;

pub struct EthioSession {
    shared: Arc<Shared>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    config: EthioConfig,
    relay: Arc<dyn CommandRelay>,
    sim: Arc<SimulationState>,
    run: AtomicBool,
    /// True while the pause currently held on the simulation is ours.
    paused_by_conn_err: AtomicBool,
    last_ready: AtomicBool,
    last_paused: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
    gate: BackoffGate,
}

impl EthioSession {
    pub fn new(
        config: EthioConfig,
        relay: Arc<dyn CommandRelay>,
        sim: Arc<SimulationState>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                relay,
                sim,
                run: AtomicBool::new(false),
                paused_by_conn_err: AtomicBool::new(false),
                last_ready: AtomicBool::new(false),
                last_paused: AtomicBool::new(false),
                stream: Mutex::new(None),
                gate: BackoffGate::new(),
            }),
            receiver: Mutex::new(None),
        }
    }

    /// Open the socket to the configured controller. Failure is logged
    /// with the endpoint and reported; the receiver thread will keep
    /// retrying either way once started.
    pub fn connect(&self) -> Result<(), TransportError> {
        self.shared.connect()
    }

    /// Spawn the receiver thread. Call once after [`EthioSession::connect`].
    pub fn start_receive(&self) -> Result<(), TransportError> {
        let mut receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner());
        if receiver.is_some() {
            debug!(target: "ethio", "receiver already running");
            return Ok(());
        }
        self.shared.run.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("ethio-recv".into())
            .spawn(move || shared.receive_loop())
            .map_err(TransportError::Io)?;
        *receiver = Some(handle);
        Ok(())
    }

    /// Stop the receiver thread and close the socket. Wakes a reconnect
    /// wait immediately; never waits out a backoff interval.
    pub fn shutdown(&self) {
        self.shared.run.store(false, Ordering::Release);
        self.shared.gate.cancel();
        self.shared.close_socket();
        let handle = self
            .receiver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Mirror one event to the controller: `{"Event":name,"Value":value}`.
    pub fn send_event(&self, name: &str, value: i64) -> Result<(), TransportError> {
        self.shared.send_event(name, value)
    }

    /// Subscribe this session to a vehicle's event source.
    pub fn bind_train(&self, events: &TrainEvents) {
        let shared: Arc<dyn TrainObserver> = self.shared.clone();
        events.subscribe(Arc::downgrade(&shared));
    }

    /// Remove this session from a vehicle's event source.
    pub fn unbind_train(&self, events: &TrainEvents) {
        let shared: Arc<dyn TrainObserver> = self.shared.clone();
        let weak: Weak<dyn TrainObserver> = Arc::downgrade(&shared);
        events.unsubscribe(&weak);
    }
}

impl Drop for EthioSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TrainObserver for Shared {
    fn on_reverser_changed(&self, position: i32) {
        if let Err(e) = self.send_event("ReverserChanged", i64::from(position)) {
            warn!(target: "ethio", "event send failed: {e}");
        }
    }

    fn on_interior_light_changed(&self, state: i32) {
        if let Err(e) = self.send_event("InteriorlightChanged", i64::from(state)) {
            warn!(target: "ethio", "event send failed: {e}");
        }
    }

    fn on_instrument_light_changed(&self, state: i32) {
        if let Err(e) = self.send_event("InstrumentlightChanged", i64::from(state)) {
            warn!(target: "ethio", "event send failed: {e}");
        }
    }
}

impl Shared {
    fn connect(&self) -> Result<(), TransportError> {
        let host = self.config.controller_ip.as_str();
        let port = self.config.controller_port;
        match TcpStream::connect((host, port)) {
            Ok(stream) => {
                stream.set_read_timeout(Some(self.config.receive_timeout()))?;
                info!(target: "ethio", host, port, "connection established");
                *self.stream.lock().unwrap_or_else(|e| e.into_inner()) = Some(stream);
                Ok(())
            }
            Err(e) => {
                warn!(target: "ethio", host, port, "connection error: {e}");
                Err(TransportError::Connect(e))
            }
        }
    }

    /// A second handle onto the current socket for the receiver thread.
    fn reader(&self) -> Option<TcpStream> {
        self.stream
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(|s| s.try_clone().ok())
    }

    fn close_socket(&self) {
        if let Some(stream) = self.stream.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn receive_loop(self: Arc<Self>) {
        let mut acc = LineAccumulator::new();
        let mut reader = self.reader();
        while self.run.load(Ordering::Acquire) {
            let Some(stream) = reader.as_mut() else {
                match self.reconnect() {
                    Some(fresh) => {
                        reader = Some(fresh);
                        acc.clear();
                    }
                    None => break,
                }
                continue;
            };

            let mut byte = [0u8; 1];
            match stream.read(&mut byte) {
                Ok(0) => {
                    warn!(target: "ethio", "socket closed by controller");
                    reader = None;
                }
                Ok(_) => {
                    if self.paused_by_conn_err.swap(false, Ordering::AcqRel) {
                        self.sim.pause.clear_cause(PauseCause::ControllerLink);
                        info!(target: "ethio", "link restored, resuming simulation");
                    }
                    match acc.push(byte[0]) {
                        Ok(Some(line)) => self.handle_line(&line),
                        Ok(None) => {}
                        Err(e) => warn!(target: "ethio", "dropping oversized line: {e}"),
                    }
                }
                Err(e) => {
                    match TransportError::from_read(e) {
                        TransportError::Timeout => {
                            warn!(target: "ethio", "controller not responding")
                        }
                        other => warn!(target: "ethio", "socket error: {other}"),
                    }
                    reader = None;
                }
            }
        }
    }

    /// Fixed-backoff reconnect. Returns a fresh reader handle, or `None`
    /// once the session is shutting down.
    fn reconnect(&self) -> Option<TcpStream> {
        loop {
            if !self.run.load(Ordering::Acquire) {
                return None;
            }
            self.sim.pause.assert_cause(PauseCause::ControllerLink);
            self.paused_by_conn_err.store(true, Ordering::Release);
            info!(target: "ethio", "trying to reconnect");
            if !self.gate.wait(self.config.reconnect_delay()) {
                return None;
            }
            self.close_socket();
            if self.connect().is_ok() {
                if let Some(reader) = self.reader() {
                    return Some(reader);
                }
            }
        }
    }

    fn handle_line(&self, line: &[u8]) {
        match line::classify(line) {
            Ok(InboundLine::Command { cmd }) => {
                match dispatch::dispatch_zero_arg(self.relay.as_ref(), &cmd) {
                    Ok(()) => info!(target: "ethio", %cmd, "command received"),
                    Err(e) => warn!(target: "ethio", "{e}"),
                }
            }
            Ok(InboundLine::ValueCommand { cmd, value }) => {
                match dispatch::dispatch_valued(self.relay.as_ref(), &cmd, value) {
                    Ok(()) => info!(target: "ethio", %cmd, value, "command received"),
                    Err(e) => warn!(target: "ethio", "{e}"),
                }
            }
            Ok(InboundLine::TypedCommand { cmd, value, ty }) => {
                match dispatch::dispatch_typed(self.relay.as_ref(), &cmd, value, ty) {
                    Ok(()) => info!(target: "ethio", %cmd, value, ty, "command received"),
                    Err(e) => warn!(target: "ethio", "{e}"),
                }
            }
            Ok(InboundLine::Status) => self.send_status(),
            Ok(InboundLine::Unrecognized) => {
                debug!(target: "ethio", "ignoring line without CMD or STATUS member");
            }
            Err(e) => warn!(target: "ethio", "dropping malformed line: {e}"),
        }
    }

    /// Answer a status poll: emit readiness/pause events when they changed
    /// since the last poll.
    fn send_status(&self) {
        let ready = self.sim.is_ready();
        if ready != self.last_ready.swap(ready, Ordering::AcqRel) {
            if let Err(e) = self.send_event("SimulationReady", i64::from(ready)) {
                warn!(target: "ethio", "status send failed: {e}");
            }
        }
        let paused = self.sim.pause.is_paused();
        if paused != self.last_paused.swap(paused, Ordering::AcqRel) {
            if let Err(e) = self.send_event("SimulationState", i64::from(paused)) {
                warn!(target: "ethio", "status send failed: {e}");
            }
        }
    }

    fn send_event(&self, name: &str, value: i64) -> Result<(), TransportError> {
        let frame = line::encode_line(&json!({ "Event": name, "Value": value })).map_err(|e| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        let guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        let Some(stream) = guard.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        let mut stream = stream;
        stream.write_all(&frame)?;
        Ok(())
    }
}
