use slp::{build_ping_host_packet, Conf, Protocol, SlpErr, Status};
use std::{
    io::{Read, Write},
    net::TcpListener,
    thread,
    time::Duration,
};

fn utf16_be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|x| x.to_be_bytes()).collect()
}

fn kick_packet(content: &str) -> Vec<u8> {
    let body = utf16_be(content);
    let mut packet = vec![0xFF];

    packet.extend_from_slice(&((body.len() / 2) as u16).to_be_bytes());
    packet.extend_from_slice(&body);
    packet
}

/// Accept one connection, expect exactly `request`, answer with `reply` and hang up.
fn mock_server(request: Vec<u8>, reply: Vec<u8>) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = vec![0u8; request.len()];

        stream.read_exact(&mut received).unwrap();
        assert_eq!(received, request);

        stream.write_all(&reply).unwrap();
    });

    (port, handle)
}

fn conf(port: u16) -> Conf {
    Conf::create_with_port("127.0.0.1", port).with_timeout(Duration::from_secs(5))
}

#[test]
fn legacy_status_from_mock_server() {
    // The request embeds the port, so bind first and build the expectation after.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let request = build_ping_host_packet("127.0.0.1", port);
    let reply = kick_packet("§1\u{0}127\u{0}1.6.4\u{0}A Minecraft Server\u{0}5\u{0}20");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = vec![0u8; request.len()];

        stream.read_exact(&mut received).unwrap();
        assert_eq!(received, request);

        stream.write_all(&reply).unwrap();
    });

    let server = conf(port).get_legacy_server_status().unwrap();
    handle.join().unwrap();

    assert_eq!(server.protocol_version, "127");
    assert_eq!(server.server_version, "1.6.4");
    assert_eq!(server.motd, "A Minecraft Server");
    assert_eq!(server.online_players, "5");
    assert_eq!(server.max_players, "20");
}

#[test]
fn legacy_header_mismatch() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let request = build_ping_host_packet("127.0.0.1", port);

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = vec![0u8; request.len()];

        stream.read_exact(&mut received).unwrap();
        stream.write_all(&kick_packet("A Beta Server§4§16")).unwrap();
    });

    let result = conf(port).get_legacy_server_status();
    handle.join().unwrap();

    match result {
        Err(SlpErr::ProtocolErr(msg)) => assert!(msg.starts_with("invalid response header")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn beta_status_from_mock_server() {
    let (port, handle) = mock_server(vec![0xFE], kick_packet("A Beta Server§4§16"));

    let status = conf(port).get_status(Protocol::Beta).unwrap();
    handle.join().unwrap();

    match status {
        Status::Beta(server) => {
            assert_eq!(server.motd, "A Beta Server");
            assert_eq!(server.online_players, "4");
            assert_eq!(server.max_players, "16");
        }
        other => panic!("unexpected status: {:?}", other),
    }
}

#[test]
fn beta_invalid_packet_id() {
    let (port, handle) = mock_server(vec![0xFE], vec![0x02, 0x00, 0x00]);

    let result = conf(port).get_beta_legacy_server_status();
    handle.join().unwrap();

    assert!(matches!(result, Err(SlpErr::ProtocolErr(_))));
}
