//! Session tests against an in-process fake controller.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ethio::{EthioConfig, EthioSession};
use sim_input::{CommandPhase, InputEvent, PauseCause, QueueRelay, SimulationState, TrainEvents, UserCommand};

fn test_config(port: u16) -> EthioConfig {
    EthioConfig {
        enable: true,
        controller_ip: "127.0.0.1".into(),
        controller_port: port,
        receive_timeout_ms: 200,
        reconnect_delay_ms: 50,
    }
}

struct Harness {
    listener: TcpListener,
    session: EthioSession,
    events: crossbeam_channel::Receiver<InputEvent>,
    sim: Arc<SimulationState>,
}

fn start_session(config_tweak: impl FnOnce(&mut EthioConfig)) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake controller");
    let port = listener.local_addr().expect("local addr").port();
    let mut config = test_config(port);
    config_tweak(&mut config);

    let (relay, events) = QueueRelay::new();
    let sim = Arc::new(SimulationState::new());
    let session = EthioSession::new(config, Arc::new(relay), Arc::clone(&sim));
    session.connect().expect("initial connect");
    session.start_receive().expect("start receiver");

    Harness {
        listener,
        session,
        events,
        sim,
    }
}

fn accept(listener: &TcpListener) -> TcpStream {
    let (stream, _) = listener.accept().expect("accept");
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .expect("peer read timeout");
    stream
}

fn read_event_line(peer: &mut TcpStream) -> Option<String> {
    let mut reader = BufReader::new(peer.try_clone().ok()?);
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_owned()),
    }
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {what}");
}

#[test_log::test]
fn command_line_dispatches_exactly_once() {
    let h = start_session(|_| {});
    let mut peer = accept(&h.listener);

    peer.write_all(b"{\"CMD\":\"whistleactivate\"}\r\n")
        .expect("write command");

    let event = h
        .events
        .recv_timeout(Duration::from_secs(2))
        .expect("dispatched event");
    assert_eq!(event.command, UserCommand::WhistleActivate);
    assert_eq!(event.phase, CommandPhase::Press);
    assert!(
        h.events.recv_timeout(Duration::from_millis(150)).is_err(),
        "one line dispatches one event"
    );

    h.session.shutdown();
}

#[test_log::test]
fn no_dispatch_before_line_terminator() {
    let h = start_session(|_| {});
    let mut peer = accept(&h.listener);

    peer.write_all(b"{\"CMD\":\"whistleactivate\"}")
        .expect("write fragment");
    assert!(
        h.events.recv_timeout(Duration::from_millis(300)).is_err(),
        "fragment without terminator must not dispatch"
    );

    peer.write_all(b"\r\n").expect("write terminator");
    let event = h
        .events
        .recv_timeout(Duration::from_secs(2))
        .expect("event after terminator");
    assert_eq!(event.command, UserCommand::WhistleActivate);

    h.session.shutdown();
}

#[test_log::test]
fn malformed_line_is_dropped_and_loop_recovers() {
    let h = start_session(|_| {});
    let mut peer = accept(&h.listener);

    peer.write_all(b"{\"CMD\":\r\n").expect("write broken line");
    peer.write_all(b"{\"CMD\":\"reverserforward\"}\r\n")
        .expect("write valid line");

    let event = h
        .events
        .recv_timeout(Duration::from_secs(2))
        .expect("valid line after malformed one");
    assert_eq!(event.command, UserCommand::ReverserForward);
    assert!(h.events.recv_timeout(Duration::from_millis(150)).is_err());

    h.session.shutdown();
}

#[test_log::test]
fn reconnect_pauses_simulation_and_resumes_on_traffic() {
    let h = start_session(|_| {});
    let peer = accept(&h.listener);

    // Controller vanishes: the session must pause the simulation and keep
    // retrying against the still-listening endpoint.
    drop(peer);
    wait_until("pause asserted", || {
        h.sim.pause.holds(PauseCause::ControllerLink)
    });

    let mut peer = accept(&h.listener);
    peer.write_all(b"{\"CMD\":\"whistleactivate\"}\r\n")
        .expect("write after reconnect");

    let event = h
        .events
        .recv_timeout(Duration::from_secs(2))
        .expect("dispatch after reconnect");
    assert_eq!(event.command, UserCommand::WhistleActivate);
    wait_until("pause cleared", || {
        !h.sim.pause.holds(PauseCause::ControllerLink)
    });

    h.session.shutdown();
}

#[test_log::test]
fn a_foreign_pause_survives_link_recovery() {
    let h = start_session(|_| {});
    let peer = accept(&h.listener);
    h.sim.pause.assert_cause(PauseCause::Ui);

    drop(peer);
    wait_until("pause asserted", || {
        h.sim.pause.holds(PauseCause::ControllerLink)
    });

    let mut peer = accept(&h.listener);
    peer.write_all(b"{\"STATUS\":1}\r\n").expect("write");
    wait_until("link pause cleared", || {
        !h.sim.pause.holds(PauseCause::ControllerLink)
    });
    assert!(h.sim.pause.is_paused(), "ui pause must not be clobbered");

    h.session.shutdown();
}

#[test_log::test]
fn shutdown_does_not_wait_out_the_backoff() {
    // No listener at all: the session lives in its reconnect loop with the
    // stock two-second interval.
    let listener = TcpListener::bind("127.0.0.1:0").expect("probe bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let (relay, _events) = QueueRelay::new();
    let sim = Arc::new(SimulationState::new());
    let mut config = test_config(port);
    config.reconnect_delay_ms = 2_000;
    let session = EthioSession::new(config, Arc::new(relay), sim);
    let _ = session.connect();
    session.start_receive().expect("start receiver");
    std::thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    session.shutdown();
    assert!(
        started.elapsed() < Duration::from_millis(1_500),
        "shutdown must cancel the backoff wait"
    );
    drop(session);
}

#[test_log::test]
fn status_poll_reports_changes_exactly_once() {
    let h = start_session(|_| {});
    let mut peer = accept(&h.listener);

    h.sim.set_ready(true);
    peer.write_all(b"{\"STATUS\":1}\r\n").expect("first poll");
    let line = read_event_line(&mut peer).expect("ready event");
    let value: serde_json::Value = serde_json::from_str(&line).expect("json");
    assert_eq!(value["Event"], "SimulationReady");
    assert_eq!(value["Value"], 1);

    // Unchanged state: the second poll stays silent.
    peer.write_all(b"{\"STATUS\":1}\r\n").expect("second poll");
    assert!(read_event_line(&mut peer).is_none());

    h.session.shutdown();
}

#[test_log::test]
fn train_events_are_mirrored_until_unbind() {
    let h = start_session(|_| {});
    let mut peer = accept(&h.listener);

    let train = TrainEvents::new();
    h.session.bind_train(&train);
    train.reverser_changed(1);

    let line = read_event_line(&mut peer).expect("reverser event");
    let value: serde_json::Value = serde_json::from_str(&line).expect("json");
    assert_eq!(value["Event"], "ReverserChanged");
    assert_eq!(value["Value"], 1);

    h.session.unbind_train(&train);
    train.reverser_changed(0);
    assert!(read_event_line(&mut peer).is_none(), "no events after unbind");

    h.session.shutdown();
}
