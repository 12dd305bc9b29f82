//! [PROXY protocol](https://www.haproxy.org/download/2.9/doc/proxy-protocol.txt) headers,
//! sent ahead of the first packet so a proxy such as BungeeCord accepts the connection.

use crate::SlpErr;
use std::net::SocketAddr;

const V2_SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];
/// Version 2, PROXY command.
const V2_VERSION_COMMAND: u8 = 0x21;
const V2_FAMILY_TCP4: u8 = 0x11;
const V2_FAMILY_TCP6: u8 = 0x21;

/// Build the header announcing a TCP connection from `src` to `dst`.
///
/// `version` is 1 for the text form and 2 for the binary form.
pub fn build_proxy_header(version: u8, src: SocketAddr, dst: SocketAddr) -> Result<Vec<u8>, SlpErr> {
    match version {
        1 => build_v1(src, dst),
        2 => build_v2(src, dst),
        _ => Err(SlpErr::DataErr(format!(
            "Unsupported PROXY protocol version: {}",
            version
        ))),
    }
}

fn build_v1(src: SocketAddr, dst: SocketAddr) -> Result<Vec<u8>, SlpErr> {
    let family = match (src, dst) {
        (SocketAddr::V4(_), SocketAddr::V4(_)) => "TCP4",
        (SocketAddr::V6(_), SocketAddr::V6(_)) => "TCP6",
        _ => return Err(mixed_families(src, dst)),
    };

    Ok(format!(
        "PROXY {} {} {} {} {}\r\n",
        family,
        src.ip(),
        dst.ip(),
        src.port(),
        dst.port()
    )
    .into_bytes())
}

fn build_v2(src: SocketAddr, dst: SocketAddr) -> Result<Vec<u8>, SlpErr> {
    let mut addresses = Vec::with_capacity(36);
    let family = match (src, dst) {
        (SocketAddr::V4(s), SocketAddr::V4(d)) => {
            addresses.extend_from_slice(&s.ip().octets());
            addresses.extend_from_slice(&d.ip().octets());
            V2_FAMILY_TCP4
        }
        (SocketAddr::V6(s), SocketAddr::V6(d)) => {
            addresses.extend_from_slice(&s.ip().octets());
            addresses.extend_from_slice(&d.ip().octets());
            V2_FAMILY_TCP6
        }
        _ => return Err(mixed_families(src, dst)),
    };

    addresses.extend_from_slice(&src.port().to_be_bytes());
    addresses.extend_from_slice(&dst.port().to_be_bytes());

    let mut header = V2_SIGNATURE.to_vec();

    header.push(V2_VERSION_COMMAND);
    header.push(family);
    header.extend_from_slice(&(addresses.len() as u16).to_be_bytes());
    header.append(&mut addresses);

    Ok(header)
}

fn mixed_families(src: SocketAddr, dst: SocketAddr) -> SlpErr {
    SlpErr::DataErr(format!(
        "PROXY header needs one address family, got {} and {}",
        src, dst
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn v1_tcp4() {
        let header =
            build_proxy_header(1, addr("192.168.0.1:56324"), addr("192.168.0.11:25565")).unwrap();

        assert_eq!(header, b"PROXY TCP4 192.168.0.1 192.168.0.11 56324 25565\r\n");
    }

    #[test]
    fn v1_tcp6() {
        let header = build_proxy_header(1, addr("[::1]:40000"), addr("[::1]:25565")).unwrap();

        assert_eq!(header, b"PROXY TCP6 ::1 ::1 40000 25565\r\n");
    }

    #[test]
    fn v2_tcp4() {
        let header =
            build_proxy_header(2, addr("127.0.0.1:40000"), addr("10.0.0.2:25565")).unwrap();

        assert_eq!(&header[..12], &V2_SIGNATURE);
        assert_eq!(header[12], 0x21);
        assert_eq!(header[13], 0x11);
        assert_eq!(&header[14..16], &[0x00, 0x0C]);
        assert_eq!(&header[16..20], &[127, 0, 0, 1]);
        assert_eq!(&header[20..24], &[10, 0, 0, 2]);
        assert_eq!(&header[24..26], &40000u16.to_be_bytes());
        assert_eq!(&header[26..28], &25565u16.to_be_bytes());
        assert_eq!(header.len(), 28);
    }

    #[test]
    fn v2_tcp6_length() {
        let header = build_proxy_header(2, addr("[::1]:40000"), addr("[::2]:25565")).unwrap();

        assert_eq!(header[13], 0x21);
        assert_eq!(&header[14..16], &[0x00, 0x24]);
        assert_eq!(header.len(), 16 + 36);
    }

    #[test]
    fn unsupported_version() {
        assert!(matches!(
            build_proxy_header(3, addr("127.0.0.1:1"), addr("127.0.0.1:2")),
            Err(SlpErr::DataErr(_))
        ));
    }

    #[test]
    fn mixed_families_rejected() {
        assert!(matches!(
            build_proxy_header(1, addr("127.0.0.1:1"), addr("[::1]:2")),
            Err(SlpErr::DataErr(_))
        ));
    }
}
