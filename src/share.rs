use crate::{conf::Conf, proxy::build_proxy_header, SlpErr, SocketConf};
use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

pub fn get_server_current_time() -> Result<u64, SlpErr> {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(t) => u64::try_from(t.as_millis()).map_err(|_| {
            SlpErr::DataErr(format!(
                "Failed to obtain current time. It should not exceed u64::MAX, but got: {}",
                t.as_millis()
            ))
        }),
        Err(err) => Err(SlpErr::DataErr(err.to_string())),
    }
}

fn resolve(conf: &Conf) -> Result<Vec<SocketAddr>, SlpErr> {
    let addrs = conf
        .to_socket_addrs()
        .map_err(|err| SlpErr::ConnectionErr(format!("{}: {}", conf, err)))?
        .collect::<Vec<_>>();

    if addrs.is_empty() {
        return Err(SlpErr::ConnectionErr(format!(
            "{}: host resolved to no addresses",
            conf
        )));
    }

    Ok(addrs)
}

/// Dial the server and wrap the connection into a [DeadlineStream].
///
/// Every resolved address is tried in turn; the last failure is reported.
pub fn create_tcp_socket(conf: &Conf) -> Result<DeadlineStream, SlpErr> {
    let mut last_err = None;

    for addr in resolve(conf)? {
        let attempt = match conf.socket_conf.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };

        match attempt {
            Ok(mut socket) => {
                tracing::debug!(%addr, "connected");
                socket.set_write_timeout(conf.socket_conf.write_timeout)?;

                if let Some(version) = conf.socket_conf.proxy_protocol {
                    let header = build_proxy_header(version, socket.local_addr()?, addr)?;

                    tracing::debug!(version, "sending PROXY header");
                    socket.write_all(&header)?;
                }

                return Ok(DeadlineStream::create(socket, conf.socket_conf.read_time_out));
            }
            Err(err) => last_err = Some(err),
        }
    }

    Err(match last_err {
        Some(err) => SlpErr::ConnectionErr(format!("{}: {}", conf, err)),
        None => SlpErr::ConnectionErr(format!("{}: no address to connect to", conf)),
    })
}

pub fn create_udp_socket(socket_conf: &SocketConf) -> Result<UdpSocket, SlpErr> {
    let socket = UdpSocket::bind((socket_conf.rep_udp_ipv4, socket_conf.rep_udp_port))?;

    socket.set_read_timeout(socket_conf.read_time_out)?;
    socket.set_write_timeout(socket_conf.write_timeout)?;

    Ok(socket)
}

/// A TCP stream whose reads share one deadline.
///
/// The socket read timeout is set to whatever budget remains before each read,
/// so a slow server cannot stretch a probe by trickling bytes.
pub struct DeadlineStream {
    socket: TcpStream,
    deadline: Option<Instant>,
}

impl DeadlineStream {
    pub fn create(socket: TcpStream, budget: Option<Duration>) -> Self {
        Self {
            socket,
            deadline: budget.map(|b| Instant::now() + b),
        }
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());

            if remaining.is_zero() {
                return Err(std::io::ErrorKind::TimedOut.into());
            }

            self.socket.set_read_timeout(Some(remaining))?;
        }

        self.socket.read(buf)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.socket.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.socket.flush()
    }
}

/// Encode a string as UTF-16BE code units, without terminator.
pub fn str_to_utf16_bufs(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|x| x.to_be_bytes()).collect()
}

/// Reader for the UTF-16BE strings used by pre-Netty servers.
pub struct Utf16Reader<R: Read> {
    inner: R,
}

impl<R: Read> Utf16Reader<R> {
    pub fn create(inner: R) -> Self {
        Self { inner }
    }

    /// Read one code unit, `None` at a clean end of stream.
    fn read_unit(&mut self) -> Result<Option<u16>, SlpErr> {
        let mut bufs = [0u8; 2];
        let mut filled = 0;

        while filled < 2 {
            match self.inner.read(&mut bufs[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                // Half a code unit.
                Ok(0) => return Err(SlpErr::TruncatedInput),
                Ok(n) => filled += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(Some(u16::from_be_bytes(bufs)))
    }

    /// Read code units until a NUL unit or the end of the stream.
    pub fn read_nt_str(&mut self) -> Result<String, SlpErr> {
        let mut units = Vec::new();

        while let Some(unit) = self.read_unit()? {
            if unit == 0 {
                break;
            }

            units.push(unit);
        }

        Ok(String::from_utf16_lossy(&units))
    }

    /// Read code units until the end of the stream, NUL units included.
    pub fn read_to_end_str(&mut self) -> Result<String, SlpErr> {
        let mut units = Vec::new();

        while let Some(unit) = self.read_unit()? {
            units.push(unit);
        }

        Ok(String::from_utf16_lossy(&units))
    }
}
