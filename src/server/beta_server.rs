use super::legacy_server::read_kick_packet_prefix;
use crate::{
    share::{create_tcp_socket, Utf16Reader},
    Conf, SlpErr,
};
use serde::Serialize;
use std::{
    io::{Read, Write},
    time::Instant,
};

const PING_PACKET: [u8; 1] = [0xFE];
const FIELD_DELIMITER: char = '§';

/// Beta legacy server info type, for servers from beta 1.8 to 1.3.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyBetaServer {
    /// Message of the day.
    pub motd: String,
    pub online_players: String,
    pub max_players: String,
    /// Round-trip latency, in milliseconds.
    pub ping: u64,
}

impl LegacyBetaServer {
    pub fn is_ready(&self) -> bool {
        self.max_players != "0"
    }
}

impl std::fmt::Display for LegacyBetaServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// The beta ping is the bare packet id, whatever the target.
pub fn build_beta_ping_packet() -> Vec<u8> {
    PING_PACKET.to_vec()
}

/// Parse a beta kick packet: `MOTD§online§max`, read to the end of the stream.
pub fn process_beta_server_bufs<R: Read>(mut reader: R) -> Result<LegacyBetaServer, SlpErr> {
    let _content_len = read_kick_packet_prefix(&mut reader)?;
    let content = Utf16Reader::create(reader).read_to_end_str()?;

    // Split from the right: the counts never contain '§', a MOTD might.
    let mut fields = content.rsplitn(3, FIELD_DELIMITER);

    match (fields.next(), fields.next(), fields.next()) {
        (Some(max_players), Some(online_players), Some(motd)) => Ok(LegacyBetaServer {
            motd: motd.into(),
            online_players: online_players.into(),
            max_players: max_players.into(),
            ping: 0,
        }),
        _ => Err(SlpErr::DecodeErr(format!(
            "truncated beta response, expected 3 fields separated by '{}': {:?}",
            FIELD_DELIMITER, content
        ))),
    }
}

pub fn get_beta_legacy_server_status(conf: &Conf) -> Result<LegacyBetaServer, SlpErr> {
    let mut socket = create_tcp_socket(conf)?;

    tracing::debug!(host = %conf.host, port = conf.port, "requesting beta status");

    let started = Instant::now();

    socket.write_all(&build_beta_ping_packet())?;
    socket.flush()?;

    let mut server = process_beta_server_bufs(&mut socket)?;

    server.ping = started.elapsed().as_millis() as u64;
    Ok(server)
}
