mod cas;
mod massak;

use std::{fmt::Display, str::FromStr};

pub use cas::CasType6;
pub use massak::MassK1C;

use crate::error::{hex, ConfigurationError, ProtocolError};
use crate::units::{Unit, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    CasType6,
    MassK1C,
}

impl Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolKind::CasType6 => f.write_str("cas"),
            ProtocolKind::MassK1C => f.write_str("massak"),
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = ConfigurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "cas" | "cas6" | "cas-type-6" => Ok(ProtocolKind::CasType6),
            "massak" | "massa-k" | "massk1c" | "1c" => Ok(ProtocolKind::MassK1C),
            _ => Err(ConfigurationError::BadProtocol(input.to_string())),
        }
    }
}

pub fn make_codec(kind: ProtocolKind) -> Box<dyn Codec> {
    match kind {
        ProtocolKind::CasType6 => Box::new(CasType6),
        ProtocolKind::MassK1C => Box::new(MassK1C),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetWeight,
    Info,
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::GetWeight => f.write_str("get weight"),
            Command::Info => f.write_str("info"),
        }
    }
}

/// Whether the scale can be asked for a unit, or always answers in its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSelection {
    Conversion,
    Protocol,
}

/// Exchange that must succeed before the request frame is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub request: &'static [u8],
    pub reply: &'static [u8],
}

impl Handshake {
    pub fn check(&self, reply: &[u8]) -> Result<(), ProtocolError> {
        if reply != self.reply {
            return Err(ProtocolError::Acknowledge {
                received: hex(reply),
                expected: hex(self.reply),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub frame: Vec<u8>,
    pub response_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub serial_number: u32,
}

impl Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Firmware version: {}.{}. Serial number: {}",
            self.firmware_major, self.firmware_minor, self.serial_number
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Weight(Weight),
    Info(DeviceInfo),
}

/// Encoding and validation rules of one vendor protocol.
///
/// Codecs hold no per-call state. A response frame is checked for length,
/// framing bytes, checksum and status, in that order, and the first failing
/// check is reported.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn unit_selection(&self) -> UnitSelection {
        UnitSelection::Conversion
    }

    fn supports(&self, command: Command) -> bool;

    fn handshake(&self, _command: Command) -> Option<Handshake> {
        None
    }

    /// `unit` is only passed for codecs with [`UnitSelection::Protocol`].
    fn build_request(&self, command: Command, unit: Option<Unit>)
        -> Result<Request, ProtocolError>;

    fn parse_response(&self, command: Command, frame: &[u8]) -> Result<Response, ProtocolError>;
}
