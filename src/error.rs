/// Slp uniform error definition.
#[derive(Debug, thiserror::Error)]
pub enum SlpErr {
    /// The connection could not be established, or the host did not resolve.
    #[error("failed to connect: {0}")]
    ConnectionErr(String),
    /// A blocking read or write exceeded its deadline.
    #[error("deadline exceeded")]
    Timeout,
    /// The stream ended before a length-declared read completed.
    #[error("stream ended before the expected data was read")]
    TruncatedInput,
    /// VarInts are never longer than 5 bytes.
    #[error("VarInt is longer than 5 bytes")]
    VarIntTooLong,
    /// Unexpected packet id, invalid magic byte or header mismatch.
    #[error("protocol error: {0}")]
    ProtocolErr(String),
    /// Malformed JSON or undersized delimited text.
    #[error("decode error: {0}")]
    DecodeErr(String),
    /// Invalid input supplied by the caller, such as an unparsable address.
    #[error("{0}")]
    DataErr(String),
    /// Any other socket failure.
    #[error("{0}")]
    IoErr(std::io::Error),
}

impl From<std::io::Error> for SlpErr {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            // Platforms disagree on the kind reported by an expired socket timeout.
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => SlpErr::Timeout,
            std::io::ErrorKind::UnexpectedEof => SlpErr::TruncatedInput,
            _ => SlpErr::IoErr(err),
        }
    }
}

impl From<serde_json::Error> for SlpErr {
    fn from(err: serde_json::Error) -> Self {
        SlpErr::DecodeErr(format!("malformed status payload: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for SlpErr {
    fn from(err: std::string::FromUtf8Error) -> Self {
        SlpErr::DecodeErr(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::SlpErr;
    use std::io::{Error, ErrorKind};

    #[test]
    fn io_errors_are_classified() {
        assert!(matches!(
            SlpErr::from(Error::from(ErrorKind::TimedOut)),
            SlpErr::Timeout
        ));
        assert!(matches!(
            SlpErr::from(Error::from(ErrorKind::WouldBlock)),
            SlpErr::Timeout
        ));
        assert!(matches!(
            SlpErr::from(Error::from(ErrorKind::UnexpectedEof)),
            SlpErr::TruncatedInput
        ));
        assert!(matches!(
            SlpErr::from(Error::from(ErrorKind::ConnectionReset)),
            SlpErr::IoErr(_)
        ));
    }

    #[test]
    fn json_errors_are_decode_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

        match SlpErr::from(err) {
            SlpErr::DecodeErr(msg) => assert!(msg.starts_with("malformed status payload")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
