use crate::{
    share::create_tcp_socket,
    varint::{decode_string, decode_varint, encode_string, encode_varint, read_frame, write_frame},
    Conf, SlpErr,
};
use serde::{Deserialize, Serialize};
use std::{
    io::{Cursor, Read, Write},
    time::Instant,
};

/// If the client is pinging to determine what version to use, by convention -1 should be set.
///
/// See protocol version [numbers](https://wiki.vg/Protocol_version_numbers).
const UNKNOWN_PROTOCOL_VERSION: i32 = -1;
const HANDSHAKE_PACKET_ID: i32 = 0x00;
const STATUS_REQUEST_PACKET_ID: i32 = 0x00;
const STATUS_RESPONSE_PACKET_ID: i32 = 0x00;

/// Regular Server info type.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Server {
    /// Server version. Includes version name and protocol number.
    pub version: Version,
    /// Server Player info.
    pub players: Players,
    /// Server description, similar to MOTD.
    pub description: Description,
    /// Server icon, base64 encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    /// Whether the server enables enforces secure chat.
    #[serde(
        rename = "enforcesSecureChat",
        skip_serializing_if = "Option::is_none"
    )]
    pub enforces_secure_chat: Option<bool>,

    /// Round-trip latency of the status request, in milliseconds.
    pub ping: u64,
}

impl Server {
    /// While a server is starting up it answers pings with an empty JSON object,
    /// which shows up here as a max player count of 0.
    pub fn is_ready(&self) -> bool {
        self.players.max != 0
    }
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Players {
    pub max: i32,
    pub online: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<Player>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Player {
    pub name: String,
    pub id: String,
}

/// Either a bare string or a chat component.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Description {
    Plain(String),
    Component(DescriptionExtra),
}

impl Default for Description {
    fn default() -> Self {
        Description::Plain("".into())
    }
}

impl Description {
    /// Flatten the description into its plain text.
    pub fn text(&self) -> String {
        match self {
            Description::Plain(text) => text.clone(),
            Description::Component(component) => {
                let mut text = String::new();

                component.collect_text(&mut text);
                text
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DescriptionExtra {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underlined: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfuscated: Option<bool>,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<DescriptionExtra>,
}

impl DescriptionExtra {
    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);

        for extra in &self.extra {
            extra.collect_text(out);
        }
    }
}

/// Connection phase of a [StatusClient].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    HandshakePending,
    Status,
}

/// Next state declared by the handshake.
#[derive(Debug, Clone, Copy)]
enum NextState {
    Status = 1,
}

/// [Handshake](https://wiki.vg/Server_List_Ping#Handshake) packet.
pub struct Handshake<'a> {
    pub protocol_version: i32,
    pub server_address: &'a str,
    pub server_port: u16,
}

impl Handshake<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let mut packet = encode_varint(HANDSHAKE_PACKET_ID);

        packet.append(&mut encode_varint(self.protocol_version));
        packet.append(&mut encode_string(self.server_address));
        packet.extend_from_slice(&self.server_port.to_be_bytes());
        packet.append(&mut encode_varint(NextState::Status as i32));

        packet
    }
}

/// [Status Request](https://wiki.vg/Server_List_Ping#Status_Request) packet, empty body.
pub fn encode_status_request() -> Vec<u8> {
    encode_varint(STATUS_REQUEST_PACKET_ID)
}

/// Client side of the status phase over any byte stream.
pub struct StatusClient<S: Read + Write> {
    stream: S,
    state: ProtocolState,
}

impl<S: Read + Write> StatusClient<S> {
    pub fn create(stream: S) -> Self {
        Self {
            stream,
            state: ProtocolState::HandshakePending,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Send the handshake and move into the status phase.
    pub fn handshake(&mut self, host: &str, port: u16) -> Result<(), SlpErr> {
        if self.state != ProtocolState::HandshakePending {
            return Err(SlpErr::ProtocolErr("handshake already sent".into()));
        }

        let packet = Handshake {
            protocol_version: UNKNOWN_PROTOCOL_VERSION,
            server_address: host,
            server_port: port,
        }
        .encode();

        write_frame(&mut self.stream, &packet)?;
        self.state = ProtocolState::Status;

        Ok(())
    }

    /// Send the status request and decode the response frame.
    pub fn request_status(&mut self) -> Result<Server, SlpErr> {
        if self.state != ProtocolState::Status {
            return Err(SlpErr::ProtocolErr(
                "status request sent before handshake".into(),
            ));
        }

        let started = Instant::now();

        write_frame(&mut self.stream, &encode_status_request())?;

        let frame = read_frame(&mut self.stream)?;
        let ping = started.elapsed().as_millis() as u64;

        tracing::trace!(len = frame.len(), "status response frame");

        let mut server = decode_status_response(&frame)?;

        server.ping = ping;
        Ok(server)
    }
}

/// Decode the packet carried by a status response frame.
pub fn decode_status_response(packet: &[u8]) -> Result<Server, SlpErr> {
    let mut cursor = Cursor::new(packet);
    let id = decode_varint(&mut cursor)?;

    if id != STATUS_RESPONSE_PACKET_ID {
        return Err(SlpErr::ProtocolErr(format!("unexpected packet id: {}", id)));
    }

    let json = decode_string(&mut cursor)?;

    Ok(serde_json::from_str::<Server>(&json)?)
}

pub fn get_server_status(conf: &Conf) -> Result<Server, SlpErr> {
    let socket = create_tcp_socket(conf)?;
    let mut client = StatusClient::create(socket);

    tracing::debug!(host = %conf.host, port = conf.port, "requesting modern status");

    client.handshake(&conf.host, conf.port)?;
    client.request_status()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_layout() {
        let packet = Handshake {
            protocol_version: -1,
            server_address: "localhost",
            server_port: 25565,
        }
        .encode();

        let mut expected = vec![0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x09];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD, 0x01]);

        assert_eq!(packet, expected);
    }

    #[test]
    fn status_request_is_bare_id() {
        assert_eq!(encode_status_request(), vec![0x00]);
    }

    #[test]
    fn status_request_requires_handshake() {
        let mut client = StatusClient::create(Cursor::new(Vec::new()));

        assert_eq!(client.state(), ProtocolState::HandshakePending);
        assert!(matches!(
            client.request_status(),
            Err(SlpErr::ProtocolErr(_))
        ));
    }

    #[test]
    fn handshake_moves_to_status() {
        let mut client = StatusClient::create(Cursor::new(Vec::new()));

        client.handshake("localhost", 25565).unwrap();
        assert_eq!(client.state(), ProtocolState::Status);
        assert!(client.handshake("localhost", 25565).is_err());
    }

    fn response_packet(id: i32, json: &str) -> Vec<u8> {
        let mut packet = encode_varint(id);

        packet.append(&mut encode_string(json));
        packet
    }

    #[test]
    fn decode_plain_description() {
        let server = decode_status_response(&response_packet(
            0,
            r#"{"version":{"name":"1.20.1","protocol":763},"players":{"online":3,"max":20},"description":"A Server"}"#,
        ))
        .unwrap();

        assert_eq!(server.version.name, "1.20.1");
        assert_eq!(server.version.protocol, 763);
        assert_eq!(server.players.online, 3);
        assert_eq!(server.players.max, 20);
        assert_eq!(server.description.text(), "A Server");
        assert!(server.favicon.is_none());
        assert!(server.is_ready());
    }

    #[test]
    fn decode_component_description() {
        let server = decode_status_response(&response_packet(
            0,
            r#"{"version":{"name":"Paper 1.20.4","protocol":765},
                "players":{"online":1,"max":50,"sample":[{"name":"Steve","id":"8667ba71-b85a-4004-af54-457a9734eed7"}]},
                "description":{"text":"Hello ","extra":[{"text":"world","bold":true}]},
                "favicon":"data:image/png;base64,AAAA",
                "enforcesSecureChat":true,
                "previewsChat":false}"#,
        ))
        .unwrap();

        assert_eq!(server.description.text(), "Hello world");
        assert_eq!(server.players.sample[0].name, "Steve");
        assert_eq!(server.favicon.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(server.enforces_secure_chat, Some(true));
    }

    #[test]
    fn booting_server_is_not_ready() {
        let server = decode_status_response(&response_packet(0, "{}")).unwrap();

        assert_eq!(server.players.max, 0);
        assert!(!server.is_ready());
    }

    #[test]
    fn unexpected_packet_id() {
        match decode_status_response(&response_packet(1, "{}")) {
            Err(SlpErr::ProtocolErr(msg)) => assert_eq!(msg, "unexpected packet id: 1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn malformed_payload() {
        assert!(matches!(
            decode_status_response(&response_packet(0, "{\"version\":")),
            Err(SlpErr::DecodeErr(_))
        ));
    }
}
