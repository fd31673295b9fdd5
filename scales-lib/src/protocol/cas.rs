//! CAS "Type 6" protocol.
//!
//! The host sends ENQ and waits for ACK, then sends DC1 and receives a
//! 15 byte frame:
//!
//! ```text
//! 01 02 | status | weight (7 ASCII chars) | unit (2 ASCII chars) | BCC | 03 04
//! ```
//!
//! BCC is the XOR of the ten payload bytes between the markers.

use std::ops::Range;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{Codec, Command, Handshake, Request, Response};
use crate::error::{hex, ProtocolError};
use crate::units::{LoadState, Unit, Weight};

const ENQ: u8 = 0x05;
const ACK: u8 = 0x06;
const DC1: u8 = 0x11;

const FRAME_LEN: usize = 15;
const WRAP: [u8; 4] = [0x01, 0x02, 0x03, 0x04];
const PAYLOAD: Range<usize> = 2..12;
const BCC: usize = 12;

// Offsets inside the payload.
const STATUS: usize = 0;
const WEIGHT: Range<usize> = 1..8;
const UNIT: Range<usize> = 8..10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
enum Status {
    Stable = 0x53,
    Unstable = 0x55,
    Overload = 0x46,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CasType6;

impl CasType6 {
    fn parse_weight(&self, frame: &[u8]) -> Result<Weight, ProtocolError> {
        if frame.len() != FRAME_LEN {
            return Err(ProtocolError::FrameLength {
                expected: FRAME_LEN,
                received: frame.len(),
            });
        }

        let wrap = [frame[0], frame[1], frame[13], frame[14]];
        if wrap != WRAP {
            return Err(ProtocolError::Framing {
                field: "wrap",
                received: hex(&wrap),
                expected: hex(&WRAP),
            });
        }

        let payload = &frame[PAYLOAD];
        let computed = bcc(payload);
        if computed != frame[BCC] {
            return Err(ProtocolError::Checksum {
                received: hex(&[frame[BCC]]),
                computed: hex(&[computed]),
            });
        }

        let status = Status::from_u8(payload[STATUS])
            .ok_or(ProtocolError::UnknownStatus(payload[STATUS]))?;

        let text = String::from_utf8_lossy(&payload[WEIGHT]);
        let text = text.trim();
        let value = text.parse::<f64>().ok().filter(|v| v.is_finite());

        match status {
            // Saturated readings may carry "OL"-style text and a blank unit.
            Status::Overload => {
                let unit = parse_unit(&payload[UNIT]).unwrap_or(Unit::Kilogram);
                let load = if text.starts_with('-') {
                    LoadState::Underload
                } else {
                    LoadState::Overload
                };
                Ok(Weight::new(value.unwrap_or(0.0), unit, false).with_load(load))
            }
            Status::Stable | Status::Unstable => {
                let unit = parse_unit(&payload[UNIT])?;
                let value = value.ok_or_else(|| ProtocolError::InvalidField {
                    field: "weight",
                    received: text.to_string(),
                })?;
                Ok(Weight::new(value, unit, status == Status::Stable))
            }
        }
    }
}

impl Codec for CasType6 {
    fn name(&self) -> &'static str {
        "CAS Type 6"
    }

    fn supports(&self, command: Command) -> bool {
        command == Command::GetWeight
    }

    fn handshake(&self, command: Command) -> Option<Handshake> {
        match command {
            Command::GetWeight => Some(Handshake {
                request: &[ENQ],
                reply: &[ACK],
            }),
            Command::Info => None,
        }
    }

    fn build_request(
        &self,
        command: Command,
        _unit: Option<Unit>,
    ) -> Result<Request, ProtocolError> {
        match command {
            Command::GetWeight => Ok(Request {
                frame: vec![DC1],
                response_len: FRAME_LEN,
            }),
            Command::Info => Err(ProtocolError::Unsupported(command)),
        }
    }

    fn parse_response(&self, command: Command, frame: &[u8]) -> Result<Response, ProtocolError> {
        match command {
            Command::GetWeight => self.parse_weight(frame).map(Response::Weight),
            Command::Info => Err(ProtocolError::Unsupported(command)),
        }
    }
}

fn bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}

fn parse_unit(code: &[u8]) -> Result<Unit, ProtocolError> {
    match code {
        b" g" | b"g " => Ok(Unit::Gram),
        b"kg" => Ok(Unit::Kilogram),
        b"lb" => Ok(Unit::Pound),
        b"oz" => Ok(Unit::Ounce),
        _ => Err(ProtocolError::InvalidField {
            field: "measure unit",
            received: hex(code),
        }),
    }
}
