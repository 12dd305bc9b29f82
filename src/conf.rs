use crate::{
    server, BedrockServer, LegacyBetaServer, LegacyServer, Protocol, Server, SlpErr, Status,
};
use std::{
    net::{Ipv4Addr, SocketAddr, ToSocketAddrs},
    time::Duration,
};

/// Default port of Java Edition servers.
pub const DEFAULT_JAVA_PORT: u16 = 25565;
/// Default port of Bedrock Edition servers.
pub const DEFAULT_BEDROCK_PORT: u16 = 19132;

/// Main struct used for configuring the connection.
///
/// By default, the port number for Java Edition is 25565,
/// and for Bedrock Edition (including Pocket Edition), it is 19132.
#[derive(Debug, Clone)]
pub struct Conf {
    /// Server IP address or a domain name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// See [SocketConf].
    pub socket_conf: SocketConf,
}

/// Additional socket configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConf {
    /// Total time all reads of one probe may take. Once spent, the probe fails with
    /// [SlpErr::Timeout].
    pub read_time_out: Option<Duration>,
    /// Set the write timeout for socket.
    pub write_timeout: Option<Duration>,
    /// Set the timeout for establishing the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Specify the address for creating a UDP socket.
    /// The default value is [Ipv4Addr::UNSPECIFIED].
    pub rep_udp_ipv4: Ipv4Addr,
    /// Specify the local port for creating a UDP socket.
    /// The default value is 0, letting the system pick one.
    pub rep_udp_port: u16,
    /// PROXY protocol version (1 or 2) to announce before the first packet of a TCP probe.
    /// `None` sends no header.
    pub proxy_protocol: Option<u8>,
}

impl Default for SocketConf {
    fn default() -> Self {
        Self {
            read_time_out: None,
            write_timeout: None,
            connect_timeout: None,
            rep_udp_ipv4: Ipv4Addr::UNSPECIFIED,
            rep_udp_port: 0,
            proxy_protocol: None,
        }
    }
}

impl ToSocketAddrs for Conf {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        (&*self.host, self.port).to_socket_addrs()
    }
}

impl std::fmt::Display for Conf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Conf {
    /// Create a connection configuration using the default port.
    ///
    /// Default port is based on Java Edition(25565), to create a default port based on
    /// Bedrock Edition(19132), use [Conf::create_with_port] to manually specify it.
    ///
    /// # Examples
    ///
    /// ```
    /// # use slp::{Conf, SocketConf};
    /// #
    /// let conf = Conf::create("www.example.com");
    /// #
    /// # assert_eq!(conf.host, "www.example.com");
    /// # assert_eq!(conf.port, 25565);
    /// # assert_eq!(conf.socket_conf, SocketConf::default());
    /// ```
    pub fn create(host: &str) -> Self {
        Self::create_with_port(host, DEFAULT_JAVA_PORT)
    }

    /// Create a connection configuration using the specified port.
    ///
    /// # Example
    ///
    /// ```
    /// # use slp::Conf;
    /// #
    /// let conf = Conf::create_with_port("www.example.com", 19132);
    /// #
    /// # assert_eq!(conf.port, 19132);
    /// ```
    pub fn create_with_port(host: &str, port: u16) -> Self {
        Self {
            host: host.trim().into(),
            port,
            socket_conf: SocketConf::default(),
        }
    }

    /// Create a connection configuration from a `host:port` string.
    ///
    /// If the port cannot be converted to [u16], it will return a [SlpErr::DataErr].
    ///
    /// # Example
    ///
    /// ```
    /// # use slp::{Conf, SlpErr};
    /// #
    /// # fn main() -> Result<(), SlpErr> {
    ///     let conf = Conf::create_from_str("www.example.com:25565")?;
    /// #
    /// #   assert_eq!(conf.host, "www.example.com");
    /// #   assert_eq!(conf.port, 25565);
    /// #
    /// #   let conf = Conf::create_from_str("25565");
    /// #   assert!(conf.is_err());
    /// #   let conf = Conf::create_from_str("www.example.com:-1");
    /// #   assert!(conf.is_err());
    /// #   Ok(())
    /// # }
    /// ```
    pub fn create_from_str(addr: &str) -> Result<Self, SlpErr> {
        match addr.split_once(':') {
            Some((host, port)) => Self::create_from_parts(host, port),
            None => Err(SlpErr::DataErr(format!(
                "Invalid socket address syntax: {}",
                addr
            ))),
        }
    }

    /// Like [Conf::create_from_str], but a missing `:port` falls back to `default_port`.
    ///
    /// ```
    /// # use slp::{Conf, DEFAULT_BEDROCK_PORT};
    /// let conf = Conf::create_from_str_with_default("play.example.com", DEFAULT_BEDROCK_PORT).unwrap();
    /// assert_eq!(conf.port, 19132);
    /// ```
    pub fn create_from_str_with_default(addr: &str, default_port: u16) -> Result<Self, SlpErr> {
        match addr.split_once(':') {
            Some((host, port)) => Self::create_from_parts(host, port),
            None => Ok(Self::create_with_port(addr, default_port)),
        }
    }

    fn create_from_parts(host: &str, port: &str) -> Result<Self, SlpErr> {
        let host = host.trim();

        if host.is_empty() {
            return Err(SlpErr::DataErr("Missing host".into()));
        }

        match port.trim().parse::<u16>() {
            Ok(port) => Ok(Self::create_with_port(host, port)),
            Err(_) => Err(SlpErr::DataErr(format!("Invalid port: {}", port))),
        }
    }

    /// Use one timeout for connecting, writing and the total read time of a probe.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.socket_conf.read_time_out = Some(timeout);
        self.socket_conf.write_timeout = Some(timeout);
        self.socket_conf.connect_timeout = Some(timeout);
        self
    }

    /// Prefix TCP probes with a PROXY protocol header of the given version.
    pub fn with_proxy_protocol(mut self, version: u8) -> Self {
        self.socket_conf.proxy_protocol = Some(version);
        self
    }

    /// Probe the server with the given protocol generation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use slp::{Conf, Protocol, SlpErr};
    ///
    /// fn main() -> Result<(), SlpErr> {
    ///     let status = Conf::create("www.example.com").get_status(Protocol::Legacy)?;
    ///
    ///     println!("{}", status);
    ///     Ok(())
    /// }
    /// ```
    pub fn get_status(&self, protocol: Protocol) -> Result<Status, SlpErr> {
        Ok(match protocol {
            Protocol::Modern => Status::Modern(self.get_server_status()?),
            Protocol::Legacy => Status::Legacy(self.get_legacy_server_status()?),
            Protocol::Beta => Status::Beta(self.get_beta_legacy_server_status()?),
            Protocol::Bedrock => Status::Bedrock(self.get_bedrock_server_status()?),
        })
    }

    /// Get info from a modern Java Edition server.
    ///
    /// Using the [Server List Ping](https://wiki.vg/Server_List_Ping#Current_.281.7.2B.29) protocol.
    /// Suitable for Java Edition servers version 1.7 and above. Return type is [Server].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use slp::{Conf, SlpErr};
    ///
    /// fn main() -> Result<(), SlpErr> {
    ///     let server = Conf::create("www.example.com");
    ///     let info = server.get_server_status()?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn get_server_status(&self) -> Result<Server, SlpErr> {
        server::get_server_status(self)
    }

    /// Get info from a legacy Java Edition server.
    ///
    /// Uses the 1.6 ping, which modern servers still answer.
    /// Return type is [LegacyServer].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use slp::{Conf, SlpErr};
    ///
    /// fn main() -> Result<(), SlpErr> {
    ///     let server = Conf::create("www.example.com");
    ///     let info = server.get_legacy_server_status()?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn get_legacy_server_status(&self) -> Result<LegacyServer, SlpErr> {
        server::get_legacy_server_status(self)
    }

    /// Get info from a Java Edition server in beta release.
    ///
    /// Suitable for Java Edition servers version beta 1.8 to 1.3.
    /// Return type is [LegacyBetaServer].
    pub fn get_beta_legacy_server_status(&self) -> Result<LegacyBetaServer, SlpErr> {
        server::get_beta_legacy_server_status(self)
    }

    /// Get info from a Bedrock Edition server using the RakNet
    /// [unconnected ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use slp::{Conf, SlpErr};
    ///
    /// fn main() -> Result<(), SlpErr> {
    ///     let server = Conf::create_with_port("www.example.com", 19132);
    ///     let info = server.get_bedrock_server_status()?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn get_bedrock_server_status(&self) -> Result<BedrockServer, SlpErr> {
        server::get_bedrock_server_status(self)
    }
}
