//! Integration tests over real localhost sockets.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::timeout;

use network_backend::{Client, MessageHandler, Server};
use network_shared::frame::MAX_MSG_SIZE;
use network_shared::message::Message;
use network_shared::wire;

const LOCALHOST: &str = "127.0.0.1";

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Handler that forwards every message into a channel.
fn collector() -> (MessageHandler, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: MessageHandler = Arc::new(move |_conn, message| {
        let _ = tx.send(message);
    });
    (handler, rx)
}

#[test_log::test(tokio::test)]
async fn request_is_answered_on_the_originating_connection() {
    let handler: MessageHandler = Arc::new(|conn, message| {
        if let Message::EventRequest { request_id, .. } = message {
            conn.send_message(&Message::Ack {
                request_id,
                ok: true,
            })
            .expect("encode ack");
        }
    });
    let server = Server::bind(LOCALHOST, 0, handler).await.expect("bind");

    let (client_handler, mut inbound) = collector();
    let client = Client::connect(LOCALHOST, server.local_addr().port(), client_handler)
        .await
        .expect("connect");

    client
        .send_message(&Message::EventRequest {
            request_id: 7,
            name: "semaphore_12".into(),
        })
        .expect("send");

    let reply = timeout(Duration::from_secs(3), inbound.recv())
        .await
        .expect("reply in time")
        .expect("channel open");
    assert_eq!(
        reply,
        Message::Ack {
            request_id: 7,
            ok: true
        }
    );
}

#[test_log::test(tokio::test)]
async fn garbage_header_drops_connection_but_not_server() {
    let (handler, _inbound) = collector();
    let server = Server::bind(LOCALHOST, 0, handler).await.expect("bind");
    let port = server.local_addr().port();

    let mut raw = tokio::net::TcpStream::connect((LOCALHOST, port))
        .await
        .expect("raw connect");
    wait_until("accept", || server.connection_count() == 1).await;

    raw.write_all(&[0xFF; 8]).await.expect("write garbage");
    wait_until("teardown", || server.connection_count() == 0).await;

    // The accept loop keeps running after the bad peer.
    let (client_handler, _rx) = collector();
    let _client = Client::connect(LOCALHOST, port, client_handler)
        .await
        .expect("connect after garbage peer");
    wait_until("second accept", || server.connection_count() == 1).await;
}

#[test_log::test(tokio::test)]
async fn oversize_length_is_rejected_before_any_body_read() {
    let (handler, mut inbound) = collector();
    let server = Server::bind(LOCALHOST, 0, handler).await.expect("bind");

    let mut raw = tokio::net::TcpStream::connect((LOCALHOST, server.local_addr().port()))
        .await
        .expect("raw connect");
    wait_until("accept", || server.connection_count() == 1).await;

    let mut header = Vec::new();
    wire::store_u32(&mut header, network_shared::frame::FRAME_MAGIC);
    wire::store_u32(&mut header, MAX_MSG_SIZE + 1);
    raw.write_all(&header).await.expect("write header");

    wait_until("teardown", || server.connection_count() == 0).await;
    assert!(inbound.try_recv().is_err(), "no message may be dispatched");
}

#[test_log::test(tokio::test)]
async fn client_disconnect_prunes_server_set() {
    let (handler, _inbound) = collector();
    let server = Server::bind(LOCALHOST, 0, handler).await.expect("bind");

    let (client_handler, _rx) = collector();
    let client = Client::connect(LOCALHOST, server.local_addr().port(), client_handler)
        .await
        .expect("connect");
    wait_until("accept", || server.connection_count() == 1).await;

    client.disconnect();
    wait_until("prune", || server.connection_count() == 0).await;
}

#[test_log::test(tokio::test)]
async fn broadcast_reaches_every_client() {
    let (handler, _inbound) = collector();
    let server = Server::bind(LOCALHOST, 0, handler).await.expect("bind");
    let port = server.local_addr().port();

    let (handler_a, mut rx_a) = collector();
    let (handler_b, mut rx_b) = collector();
    let _client_a = Client::connect(LOCALHOST, port, handler_a).await.expect("a");
    let _client_b = Client::connect(LOCALHOST, port, handler_b).await.expect("b");
    wait_until("both accepted", || server.connection_count() == 2).await;

    let tick = Message::ClockSync {
        seconds: 12.5,
        paused: false,
    };
    server.broadcast(&tick);

    for rx in [&mut rx_a, &mut rx_b] {
        let got = timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("broadcast in time")
            .expect("channel open");
        assert_eq!(got, tick);
    }
}

#[test_log::test(tokio::test)]
async fn connect_failure_is_reported_not_retried() {
    // Grab a port that nothing listens on anymore.
    let port = {
        let probe = tokio::net::TcpListener::bind((LOCALHOST, 0))
            .await
            .expect("probe bind");
        probe.local_addr().expect("probe addr").port()
    };

    let (handler, _rx) = collector();
    let started = std::time::Instant::now();
    let result = Client::connect(LOCALHOST, port, handler).await;
    assert!(result.is_err());
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "a single attempt must not linger"
    );
}

#[test_log::test(tokio::test)]
async fn connect_retrying_succeeds_once_listener_appears() {
    let probe = tokio::net::TcpListener::bind((LOCALHOST, 0))
        .await
        .expect("probe bind");
    let port = probe.local_addr().expect("probe addr").port();
    drop(probe);

    let stop = tokio_util::sync::CancellationToken::new();
    let (handler, _rx) = collector();
    let connect = tokio::spawn(Client::connect_retrying(
        LOCALHOST,
        port,
        handler,
        Duration::from_millis(50),
        stop.clone(),
    ));

    // Let a few attempts fail before the server shows up.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let (server_handler, _inbound) = collector();
    let server = Server::bind(LOCALHOST, port, server_handler)
        .await
        .expect("late bind");

    let client = timeout(Duration::from_secs(5), connect)
        .await
        .expect("retry loop finished")
        .expect("join")
        .expect("connected");
    assert!(client.connection().is_open());
    wait_until("accept", || server.connection_count() == 1).await;
}
