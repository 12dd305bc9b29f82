//! Status probes for Minecraft servers.
//!
//! Java Edition servers are asked through one of three generations of the
//! [Server List Ping](https://wiki.vg/Server_List_Ping) protocol, Bedrock Edition
//! servers through the RakNet unconnected ping. Every probe opens its own
//! connection and closes it before returning.
//!
//! ```no_run
//! use slp::{Conf, Protocol, SlpErr};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), SlpErr> {
//!     let conf = Conf::create("www.example.com").with_timeout(Duration::from_secs(5));
//!     let status = conf.get_status(Protocol::Modern)?;
//!
//!     println!("{}", status);
//!     Ok(())
//! }
//! ```

mod conf;
mod error;
mod proxy;
mod server;
mod share;
pub mod varint;

pub use conf::{Conf, SocketConf, DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT};
pub use error::SlpErr;
pub use server::*;
use serde::Serialize;

/// Protocol generation used by [Conf::get_status].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Java Edition 1.7 and above.
    Modern,
    /// The 1.6 ping, answered by 1.4 and later servers.
    Legacy,
    /// Java Edition beta 1.8 to 1.3.
    Beta,
    /// Bedrock Edition.
    Bedrock,
}

/// Result of a probe, tagged by the protocol that produced it.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "protocol", content = "status", rename_all = "snake_case")]
pub enum Status {
    Modern(Server),
    Legacy(LegacyServer),
    Beta(LegacyBetaServer),
    Bedrock(BedrockServer),
}

impl Status {
    /// False when the server answered but reports a max player count of 0,
    /// which is what a server still starting up does.
    pub fn is_ready(&self) -> bool {
        match self {
            Status::Modern(s) => s.is_ready(),
            Status::Legacy(s) => s.is_ready(),
            Status::Beta(s) => s.is_ready(),
            Status::Bedrock(s) => s.is_ready(),
        }
    }

    /// Round-trip latency, in milliseconds.
    pub fn ping(&self) -> u64 {
        match self {
            Status::Modern(s) => s.ping,
            Status::Legacy(s) => s.ping,
            Status::Beta(s) => s.ping,
            Status::Bedrock(s) => s.ping,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Modern(s) => std::fmt::Display::fmt(s, f),
            Status::Legacy(s) => std::fmt::Display::fmt(s, f),
            Status::Beta(s) => std::fmt::Display::fmt(s, f),
            Status::Bedrock(s) => std::fmt::Display::fmt(s, f),
        }
    }
}
