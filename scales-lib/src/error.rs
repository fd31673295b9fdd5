use std::{fmt::Display, io, time::Duration};

use itertools::Itertools;
use thiserror::Error;

use crate::protocol::Command;

/// Invalid or missing connection parameters. Raised while constructing a
/// connector or driver, never on first I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("connection type '{0}' is not supported, use one of: serial, socket")]
    UnsupportedConnection(String),
    #[error("required connection parameter '{0}' is missing")]
    MissingParameter(&'static str),
    #[error("unknown connection parameter '{0}'")]
    UnknownParameter(String),
    #[error("invalid value '{value}' for connection parameter '{name}'")]
    InvalidParameter { name: &'static str, value: String },
    #[error("invalid transfer timeout '{0}'")]
    InvalidTimeout(String),
    #[error("invalid protocol '{0}'")]
    BadProtocol(String),
    #[error("invalid measure unit '{0}'")]
    BadUnit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Read => f.write_str("receive"),
            Operation::Write => f.write_str("send"),
        }
    }
}

/// Failures classified by the connector. Both variants leave the connection
/// closed; the next call reopens it.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("{operation} timeout after {timeout:?}")]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
}

/// Response bytes arrived but failed validation. The connection stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid frame length: received {received} bytes, expected {expected}")]
    FrameLength { expected: usize, received: usize },
    #[error("invalid packet {field}: received \"{received}\", expected \"{expected}\"")]
    Framing {
        field: &'static str,
        received: String,
        expected: String,
    },
    #[error("checksum mismatch: received \"{received}\", computed \"{computed}\"")]
    Checksum { received: String, computed: String },
    #[error("unknown scales status {0:#04x}")]
    UnknownStatus(u8),
    #[error("invalid ACK: received \"{received}\", expected \"{expected}\"")]
    Acknowledge { received: String, expected: String },
    #[error("invalid {field}: \"{received}\"")]
    InvalidField {
        field: &'static str,
        received: String,
    },
    #[error("{0} command is not supported by this protocol")]
    Unsupported(Command),
    #[error("unexpected response to {0} command")]
    UnexpectedResponse(Command),
}

#[derive(Error, Debug)]
pub enum ScalesError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("incorrect response received from the scales: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ScalesError {
    /// True for failures the caller may retry as is; the connector reopens the
    /// transport on the next call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScalesError::Connector(_))
    }
}

pub type Result<T, E = ScalesError> = std::result::Result<T, E>;

/// Colon separated hex dump used in protocol error messages.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_uses_colon_separator() {
        assert_eq!(hex(&[0x01, 0x02, 0xAB]), "01:02:ab");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn only_connector_errors_are_recoverable() {
        let timeout = ScalesError::from(ConnectorError::Timeout {
            operation: Operation::Read,
            timeout: Duration::from_secs(1),
        });
        let protocol = ScalesError::from(ProtocolError::UnknownStatus(0x58));
        let config = ScalesError::from(ConfigurationError::MissingParameter("host"));

        assert!(timeout.is_recoverable());
        assert!(!protocol.is_recoverable());
        assert!(!config.is_recoverable());
    }

    #[test]
    fn timeout_message_names_direction() {
        let err = ConnectorError::Timeout {
            operation: Operation::Write,
            timeout: Duration::from_millis(500),
        };
        assert_eq!(err.to_string(), "send timeout after 500ms");
    }
}
