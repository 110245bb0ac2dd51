//! End-to-end runs of the demo peers over loopback.

use simsock_core::{Endpoint, EndpointConfig, Transport};
use simsock_demo::DemoLimits;
use simsock_demo::listen::Listener;
use simsock_demo::payload::{TestPayload, recv_payload, send_payload};
use simsock_demo::transmit::Transmitter;
use std::thread;
use std::time::Duration;

fn fast() -> EndpointConfig {
    EndpointConfig::default().with_retry_interval(Duration::from_millis(10))
}

fn rounds(n: usize) -> DemoLimits {
    DemoLimits {
        iterations: Some(n),
        pause: Duration::from_millis(1),
    }
}

fn exchange(transport: Transport) {
    let host = Endpoint::host(0, transport, fast()).expect("bind host");
    let port = host.local_port().expect("host port");

    let client = thread::spawn(move || {
        let endpoint = Endpoint::client("127.0.0.1", port, transport, fast()).unwrap();
        let mut transmitter = Transmitter::new(endpoint, TestPayload::default(), rounds(3));
        let sent = transmitter.transmit_payloads();
        (transmitter, sent)
    });

    let mut listener = Listener::new(host, rounds(3));
    let mut payloads = Vec::new();
    let received = listener.receive_payloads(|p| payloads.push(p));

    let (transmitter, sent) = client.join().unwrap();
    assert_eq!(sent, 3);
    assert_eq!(received, 3);
    assert!(payloads.iter().all(|p| *p == TestPayload::default()));

    // both peers still hold their handles and the host kept its port
    assert!(transmitter.endpoint().is_connected());
    assert_eq!(transmitter.endpoint().remote_addr().map(|a| a.port()), Some(port));
    assert!(listener.endpoint().is_connected());
    assert_eq!(listener.endpoint().local_port(), Some(port));
}

#[test]
fn tcp_demo_exchange() {
    exchange(Transport::Tcp);
}

#[test]
fn udp_demo_exchange() {
    exchange(Transport::Udp);
}

#[test]
fn tcp_scenario_reconstructs_values_and_string() {
    let mut host = Endpoint::host(0, Transport::Tcp, fast()).unwrap();
    let port = host.local_port().unwrap();

    let client = thread::spawn(move || {
        let mut client = Endpoint::client("127.0.0.1", port, Transport::Tcp, fast()).unwrap();
        client.send_all(&7i32.to_le_bytes()).unwrap();
        let values: Vec<u8> = [8i32, 6, 7, 5, 3, 0, 9]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(values.len(), 28);
        client.send_all(&values).unwrap();
        client.send_all(&12i32.to_le_bytes()).unwrap();
        client.send_all(b"Hello World!").unwrap();
        client
    });

    let payload = recv_payload(&mut host).unwrap();
    assert_eq!(payload.values, vec![8, 6, 7, 5, 3, 0, 9]);
    assert_eq!(payload.message, "Hello World!");
    drop(client.join().unwrap());
}

#[test]
fn custom_payload_round_trip() {
    let mut host = Endpoint::host(0, Transport::Tcp, fast()).unwrap();
    let port = host.local_port().unwrap();
    let sent = TestPayload {
        values: (-500..500).collect(),
        message: "grüße über loopback".to_owned(),
    };
    let expected = sent.clone();

    let client = thread::spawn(move || {
        let mut client = Endpoint::client("localhost", port, Transport::Tcp, fast()).unwrap();
        send_payload(&mut client, &sent).unwrap();
        client
    });

    assert_eq!(recv_payload(&mut host).unwrap(), expected);
    drop(client.join().unwrap());
}
