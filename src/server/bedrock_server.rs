use crate::{
    share::{create_udp_socket, get_server_current_time},
    Conf, SlpErr,
};
use serde::Serialize;
use std::time::{Duration, Instant};

const MAGIC_BYTES: &[u8] = &[
    0x00, 0xFF, 0xFF, 0x00, 0xFE, 0xFE, 0xFE, 0xFE, 0xFD, 0xFD, 0xFD, 0xFD, 0x12, 0x34, 0x56, 0x78,
];
const UNCONNECTED_PING_ID: u8 = 0x01;
const UNCONNECTED_PONG_ID: u8 = 0x1C;
const CLIENT_GUID: u64 = 0x736C_7070_696E_6721;
/// Packet id, time, server GUID, magic and the payload length.
const PONG_HEADER_LEN: usize = 1 + 8 + 8 + 16 + 2;
const MIN_PONG_FIELDS: usize = 8;

/// Bedrock server info type, parsed from the unconnected pong payload.
///
/// For the meaning of `server_name` and `level_name` refer to the following example:
///
/// ```text
/// MCPE;Dedicated Server;390;1.14.60;0;10;13253860892328930865;Bedrock level;Survival;1;19132;19133;
/// ```
///
/// `server_name` is "Dedicated Server" (upper MOTD line) and `level_name` is
/// "Bedrock level" (lower MOTD line).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BedrockServer {
    /// MCPE, or MCEE for Education Edition.
    pub edition: String,
    pub server_name: String,
    pub protocol_version: String,
    pub version_name: String,
    /// Online players, -1 when the server sent something that is not a number.
    pub online_players: i32,
    /// Max players, -1 when the server sent something that is not a number.
    pub max_players: i32,
    /// Server unique id.
    pub server_id: String,
    pub level_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Round-trip latency, in milliseconds.
    pub ping: u64,
}

impl std::fmt::Display for BedrockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

fn parse_count(field: &str) -> i32 {
    field.trim().parse().unwrap_or(-1)
}

impl BedrockServer {
    pub fn is_ready(&self) -> bool {
        self.max_players != 0
    }

    /// Parse the `;` separated server id string.
    pub fn parse(payload: &[u8], latency: Duration) -> Result<Self, SlpErr> {
        let info = String::from_utf8_lossy(payload);
        let fields = info.split(';').collect::<Vec<_>>();

        if fields.len() < MIN_PONG_FIELDS {
            return Err(SlpErr::DecodeErr(format!(
                "truncated discovery response, expected at least {} fields but got {}",
                MIN_PONG_FIELDS,
                fields.len()
            )));
        }

        Ok(BedrockServer {
            edition: fields[0].into(),
            server_name: fields[1].into(),
            protocol_version: fields[2].into(),
            version_name: fields[3].into(),
            online_players: parse_count(fields[4]),
            max_players: parse_count(fields[5]),
            server_id: fields[6].into(),
            level_name: fields[7].into(),
            game_mode: fields.get(8).map(|&x| x.into()),
            difficulty: fields.get(9).map(|&x| x.into()),
            ping: latency.as_millis() as u64,
        })
    }
}

/// Build the RakNet [unconnected ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping).
pub fn build_unconnected_ping(time: u64) -> Vec<u8> {
    [
        [UNCONNECTED_PING_ID].as_slice(),
        time.to_be_bytes().as_slice(),
        MAGIC_BYTES,
        CLIENT_GUID.to_be_bytes().as_slice(),
    ]
    .concat()
}

/// Extract the server id string from a RakNet unconnected pong datagram.
pub fn extract_pong_payload(datagram: &[u8]) -> Result<&[u8], SlpErr> {
    match datagram.first() {
        Some(&UNCONNECTED_PONG_ID) => {}
        Some(&first_buf) => {
            return Err(SlpErr::ProtocolErr(format!(
                "invalid packet id, expected 0x{:02X} but got 0x{:02X}",
                UNCONNECTED_PONG_ID, first_buf
            )));
        }
        None => return Err(SlpErr::TruncatedInput),
    }

    if datagram.len() < PONG_HEADER_LEN {
        return Err(SlpErr::TruncatedInput);
    }

    // Time(8 bytes) and server GUID(8 bytes) are skipped.
    if &datagram[17..33] != MAGIC_BYTES {
        return Err(SlpErr::ProtocolErr("invalid offline message magic".into()));
    }

    let len = u16::from_be_bytes([datagram[33], datagram[34]]) as usize;

    datagram
        .get(PONG_HEADER_LEN..PONG_HEADER_LEN + len)
        .ok_or(SlpErr::TruncatedInput)
}

/// One unconnected ping round trip, returning the pong payload and its latency.
pub fn ping_bedrock(conf: &Conf) -> Result<(Vec<u8>, Duration), SlpErr> {
    let socket = create_udp_socket(&conf.socket_conf)?;

    socket
        .connect(conf)
        .map_err(|err| SlpErr::ConnectionErr(format!("{}: {}", conf, err)))?;

    let started = Instant::now();

    socket.send(&build_unconnected_ping(get_server_current_time()?))?;

    // An unconnected pong always fits in one MTU.
    let mut bufs = [0u8; 1500];
    let len = socket.recv(&mut bufs)?;
    let latency = started.elapsed();

    tracing::trace!(len, "unconnected pong");

    Ok((extract_pong_payload(&bufs[..len])?.to_vec(), latency))
}

pub fn get_bedrock_server_status(conf: &Conf) -> Result<BedrockServer, SlpErr> {
    tracing::debug!(host = %conf.host, port = conf.port, "requesting bedrock status");

    let (payload, latency) = ping_bedrock(conf)?;

    BedrockServer::parse(&payload, latency)
}
