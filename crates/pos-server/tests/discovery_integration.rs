//! Integration tests for the UDP discovery responder.
//!
//! Each test starts a real responder on an ephemeral loopback port and talks
//! to it with a plain `std::net::UdpSocket`, exactly as a kiosk would (minus
//! the broadcast address).

use std::net::UdpSocket;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use pos_server::infrastructure::network::discovery::{start_discovery_responder, DiscoveryResponder};

fn start() -> (DiscoveryResponder, Arc<AtomicBool>) {
    let running = Arc::new(AtomicBool::new(true));
    let responder = start_discovery_responder("127.0.0.1:0".parse().unwrap(), Arc::clone(&running))
        .expect("responder must bind on an ephemeral port");
    (responder, running)
}

fn client_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("client bind");
    socket
        .set_read_timeout(Some(Duration::from_millis(700)))
        .unwrap();
    socket
}

fn stop(responder: DiscoveryResponder, running: Arc<AtomicBool>) {
    running.store(false, Ordering::Relaxed);
    responder.join();
}

#[test]
fn test_request_gets_exact_response_from_responder_address() {
    // Arrange
    let (responder, running) = start();
    let client = client_socket();

    // Act
    client
        .send_to(b"DISCOVER_POS_SERVER", responder.local_addr())
        .unwrap();
    let mut buf = [0u8; 1024];
    let (len, src) = client.recv_from(&mut buf).expect("responder must answer");

    // Assert
    assert_eq!(&buf[..len], b"POS_SERVER_HERE");
    assert_eq!(src, responder.local_addr());

    stop(responder, running);
}

#[test]
fn test_other_payloads_get_no_reply() {
    // Arrange
    let (responder, running) = start();
    let client = client_socket();

    for payload in [&b"hello"[..], b"DISCOVER_POS_SERVER!", b"discover_pos_server", b""] {
        // Act
        client.send_to(payload, responder.local_addr()).unwrap();
        let mut buf = [0u8; 1024];
        let result = client.recv_from(&mut buf);

        // Assert
        assert!(result.is_err(), "payload {payload:?} must not be answered");
    }

    stop(responder, running);
}

#[test]
fn test_responder_survives_garbage_and_still_answers() {
    // Arrange
    let (responder, running) = start();
    let client = client_socket();
    client.send_to(&[0xFF; 900], responder.local_addr()).unwrap();
    client.send_to(b"POS_SERVER_HERE", responder.local_addr()).unwrap();

    // Act
    client
        .send_to(b"DISCOVER_POS_SERVER", responder.local_addr())
        .unwrap();
    let mut buf = [0u8; 1024];
    let (len, _) = client.recv_from(&mut buf).expect("responder must still answer");

    // Assert
    assert_eq!(&buf[..len], b"POS_SERVER_HERE");

    stop(responder, running);
}

#[test]
fn test_each_request_gets_one_reply() {
    // Arrange
    let (responder, running) = start();
    let client = client_socket();

    // Act
    for _ in 0..3 {
        client
            .send_to(b"DISCOVER_POS_SERVER", responder.local_addr())
            .unwrap();
    }
    let mut replies = 0;
    let mut buf = [0u8; 1024];
    while let Ok((len, _)) = client.recv_from(&mut buf) {
        assert_eq!(&buf[..len], b"POS_SERVER_HERE");
        replies += 1;
    }

    // Assert
    assert_eq!(replies, 3);

    stop(responder, running);
}
