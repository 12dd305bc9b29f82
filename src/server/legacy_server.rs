use crate::{
    share::{create_tcp_socket, str_to_utf16_bufs, Utf16Reader},
    Conf, SlpErr,
};
use serde::Serialize;
use std::{
    io::{Read, Write},
    time::Instant,
};

const PLUGIN_CHANNEL: &str = "MC|PingHost";
/// Servers only keep the marker for backward compatibility, so it stays fixed.
const PROTOCOL_VERSION_MARKER: u8 = 74;
const RESPONSE_HEADER: &str = "§1";

/// Legacy server info type. Every field is text, as it is on the wire.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyServer {
    /// Protocol version (e.g. 47).
    pub protocol_version: String,
    /// Minecraft server version (e.g. 1.4.2).
    pub server_version: String,
    /// Message of the day.
    pub motd: String,
    pub online_players: String,
    pub max_players: String,
    /// Round-trip latency, in milliseconds.
    pub ping: u64,
}

impl LegacyServer {
    pub fn is_ready(&self) -> bool {
        self.max_players != "0"
    }
}

impl std::fmt::Display for LegacyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Build the 1.6 ping request, which forwards the target host and port
/// through the `MC|PingHost` plugin channel.
///
/// See [Server List Ping 1.6](https://wiki.vg/Server_List_Ping#1.6).
pub fn build_ping_host_packet(host: &str, port: u16) -> Vec<u8> {
    let channel = str_to_utf16_bufs(PLUGIN_CHANNEL);
    let host_u16 = str_to_utf16_bufs(host);
    let mut packet = vec![0xFE, 0x01, 0xFA];

    // Channel length in characters.
    packet.extend_from_slice(&((channel.len() / 2) as u16).to_be_bytes());
    packet.extend_from_slice(&channel);
    // Length of the rest of the data.
    packet.extend_from_slice(&((7 + host_u16.len()) as u16).to_be_bytes());
    packet.push(PROTOCOL_VERSION_MARKER);
    packet.extend_from_slice(&((host_u16.len() / 2) as u16).to_be_bytes());
    packet.extend_from_slice(&host_u16);
    packet.extend_from_slice(&(port as u32).to_be_bytes());

    packet
}

/// Check the kick packet prefix: packet id `0xFF` then a length that is not validated.
pub(crate) fn read_kick_packet_prefix<R: Read>(reader: &mut R) -> Result<u16, SlpErr> {
    let mut packet_id = [0u8; 1];

    reader.read_exact(&mut packet_id)?;

    if packet_id[0] != 0xFF {
        return Err(SlpErr::ProtocolErr(format!(
            "invalid packet id: 0x{:02X}",
            packet_id[0]
        )));
    }

    let mut len = [0u8; 2];

    reader.read_exact(&mut len)?;

    Ok(u16::from_be_bytes(len))
}

/// Parse a 1.6 kick packet: `§1`, protocol, version, MOTD, online, max, NUL separated.
pub fn process_legacy_server_bufs<R: Read>(mut reader: R) -> Result<LegacyServer, SlpErr> {
    let _content_len = read_kick_packet_prefix(&mut reader)?;
    let mut reader = Utf16Reader::create(reader);
    let header = reader.read_nt_str()?;

    if header != RESPONSE_HEADER {
        return Err(SlpErr::ProtocolErr(format!(
            "invalid response header: {}",
            header
        )));
    }

    Ok(LegacyServer {
        protocol_version: reader.read_nt_str()?,
        server_version: reader.read_nt_str()?,
        motd: reader.read_nt_str()?,
        online_players: reader.read_nt_str()?,
        max_players: reader.read_nt_str()?,
        ping: 0,
    })
}

pub fn get_legacy_server_status(conf: &Conf) -> Result<LegacyServer, SlpErr> {
    let mut socket = create_tcp_socket(conf)?;

    tracing::debug!(host = %conf.host, port = conf.port, "requesting legacy status");

    let started = Instant::now();

    socket.write_all(&build_ping_host_packet(&conf.host, conf.port))?;
    socket.flush()?;

    let mut server = process_legacy_server_bufs(&mut socket)?;

    server.ping = started.elapsed().as_millis() as u64;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn to_hex(bufs: &[u8]) -> String {
        bufs.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn kick_packet(content: &str) -> Vec<u8> {
        let body = str_to_utf16_bufs(content);
        let mut packet = vec![0xFF];

        packet.extend_from_slice(&((body.len() / 2) as u16).to_be_bytes());
        packet.extend_from_slice(&body);
        packet
    }

    #[test]
    fn ping_host_request_vector() {
        assert_eq!(
            to_hex(&build_ping_host_packet("localhost", 25565)),
            "fe01fa000b004d0043007c00500069006e00670048006f0073007400194a0009\
             006c006f00630061006c0068006f00730074000063dd"
        );
    }

    #[test]
    fn parse_kick_packet() {
        let server = process_legacy_server_bufs(Cursor::new(kick_packet(
            "§1\u{0}127\u{0}1.6.4\u{0}A Minecraft Server\u{0}2\u{0}20",
        )))
        .unwrap();

        assert_eq!(
            server,
            LegacyServer {
                protocol_version: "127".into(),
                server_version: "1.6.4".into(),
                motd: "A Minecraft Server".into(),
                online_players: "2".into(),
                max_players: "20".into(),
                ping: 0,
            }
        );
        assert!(server.is_ready());
    }

    #[test]
    fn invalid_packet_id() {
        let mut bufs = kick_packet("§1\u{0}127");
        bufs[0] = 0xFE;

        match process_legacy_server_bufs(Cursor::new(bufs)) {
            Err(SlpErr::ProtocolErr(msg)) => assert!(msg.starts_with("invalid packet id")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn invalid_header() {
        match process_legacy_server_bufs(Cursor::new(kick_packet("§2\u{0}127\u{0}1.6.4"))) {
            Err(SlpErr::ProtocolErr(msg)) => assert!(msg.starts_with("invalid response header")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_length_is_truncated() {
        assert!(matches!(
            process_legacy_server_bufs(Cursor::new(vec![0xFF, 0x00])),
            Err(SlpErr::TruncatedInput)
        ));
    }

    #[test]
    fn zero_max_players_is_not_ready() {
        let server = process_legacy_server_bufs(Cursor::new(kick_packet(
            "§1\u{0}127\u{0}1.6.4\u{0}Booting\u{0}0\u{0}0",
        )))
        .unwrap();

        assert!(!server.is_ready());
    }
}
