//! Massa-K "1C" protocol.
//!
//! Requests and responses share one layout:
//!
//! ```text
//! F8 55 CE | body length (u16 LE) | body | CRC-16 of body (u16 LE)
//! ```
//!
//! The first body byte is the command code in requests and the command ACK
//! in responses. Requests use the same little-endian length and body-only CRC
//! as responses, e.g. `F8 55 CE 01 00 A0 A0 00` for the weight command.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{Codec, Command, DeviceInfo, Request, Response};
use crate::error::{hex, ProtocolError};
use crate::units::{Unit, Weight};

const HEADER: [u8; 3] = [0xF8, 0x55, 0xCE];
const PREFIX_LEN: usize = 5;
const CRC_LEN: usize = 2;

const CMD_POLL: u8 = 0x00;
const CMD_GET_WEIGHT: u8 = 0xA0;

const ACK_POLL: u8 = 0x01;
const ACK_WEIGHT: u8 = 0x10;

const POLL_RESPONSE_LEN: usize = 34;
const WEIGHT_RESPONSE_LEN: usize = 14;

// Offsets inside the response body.
const ACK: usize = 0;
const FW_MINOR: usize = 4;
const FW_MAJOR: usize = 5;
const SERIAL: usize = 6;
const WEIGHT: usize = 1;
const DIVISION: usize = 5;
const STATUS: usize = 6;

/// Value of the least significant digit of the weight field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
enum Division {
    Mg100 = 0,
    G1 = 1,
    G10 = 2,
    G100 = 3,
    Kg1 = 4,
}

impl Division {
    fn grams(self, raw: i32) -> f64 {
        let raw = f64::from(raw);
        match self {
            Division::Mg100 => raw / 10.0,
            Division::G1 => raw,
            Division::G10 => raw * 10.0,
            Division::G100 => raw * 100.0,
            Division::Kg1 => raw * 1000.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MassK1C;

struct Spec {
    code: u8,
    ack: u8,
    response_len: usize,
}

fn spec(command: Command) -> Spec {
    match command {
        Command::GetWeight => Spec {
            code: CMD_GET_WEIGHT,
            ack: ACK_WEIGHT,
            response_len: WEIGHT_RESPONSE_LEN,
        },
        Command::Info => Spec {
            code: CMD_POLL,
            ack: ACK_POLL,
            response_len: POLL_RESPONSE_LEN,
        },
    }
}

impl MassK1C {
    /// Validates a response frame and returns its body.
    fn check_response<'a>(
        &self,
        command: Command,
        frame: &'a [u8],
    ) -> Result<&'a [u8], ProtocolError> {
        let spec = spec(command);
        if frame.len() != spec.response_len {
            return Err(ProtocolError::FrameLength {
                expected: spec.response_len,
                received: frame.len(),
            });
        }

        if frame[..3] != HEADER {
            return Err(ProtocolError::Framing {
                field: "header",
                received: hex(&frame[..3]),
                expected: hex(&HEADER),
            });
        }

        let body_len = frame.len() - PREFIX_LEN - CRC_LEN;
        let declared = u16::from_le_bytes([frame[3], frame[4]]);
        if usize::from(declared) != body_len {
            return Err(ProtocolError::Framing {
                field: "length",
                received: declared.to_string(),
                expected: body_len.to_string(),
            });
        }

        let (body, crc) = frame[PREFIX_LEN..].split_at(body_len);
        let computed = crc16(body).to_le_bytes();
        if crc != computed {
            return Err(ProtocolError::Checksum {
                received: hex(crc),
                computed: hex(&computed),
            });
        }

        if body[ACK] != spec.ack {
            return Err(ProtocolError::Acknowledge {
                received: hex(&body[ACK..ACK + 1]),
                expected: hex(&[spec.ack]),
            });
        }

        Ok(body)
    }

    fn parse_weight(&self, body: &[u8]) -> Result<Weight, ProtocolError> {
        let stable = match body[STATUS] {
            0 => false,
            1 => true,
            status => return Err(ProtocolError::UnknownStatus(status)),
        };

        let division =
            Division::from_u8(body[DIVISION]).ok_or_else(|| ProtocolError::InvalidField {
                field: "division cost",
                received: body[DIVISION].to_string(),
            })?;

        let raw = i32::from_le_bytes([
            body[WEIGHT],
            body[WEIGHT + 1],
            body[WEIGHT + 2],
            body[WEIGHT + 3],
        ]);
        Ok(Weight::new(division.grams(raw), Unit::Gram, stable))
    }

    fn parse_info(&self, body: &[u8]) -> DeviceInfo {
        DeviceInfo {
            firmware_major: body[FW_MAJOR],
            firmware_minor: body[FW_MINOR],
            serial_number: u32::from_le_bytes([
                body[SERIAL],
                body[SERIAL + 1],
                body[SERIAL + 2],
                body[SERIAL + 3],
            ]),
        }
    }
}

impl Codec for MassK1C {
    fn name(&self) -> &'static str {
        "Massa-K 1C"
    }

    fn supports(&self, _command: Command) -> bool {
        true
    }

    fn build_request(
        &self,
        command: Command,
        _unit: Option<Unit>,
    ) -> Result<Request, ProtocolError> {
        let spec = spec(command);
        let body = [spec.code];

        let mut frame = Vec::with_capacity(PREFIX_LEN + body.len() + CRC_LEN);
        frame.extend_from_slice(&HEADER);
        frame.extend_from_slice(&(body.len() as u16).to_le_bytes());
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&crc16(&body).to_le_bytes());

        Ok(Request {
            frame,
            response_len: spec.response_len,
        })
    }

    fn parse_response(&self, command: Command, frame: &[u8]) -> Result<Response, ProtocolError> {
        let body = self.check_response(command, frame)?;
        match command {
            Command::GetWeight => self.parse_weight(body).map(Response::Weight),
            Command::Info => Ok(Response::Info(self.parse_info(body))),
        }
    }
}

/// CRC-16 (poly 0x1021) in the vendor's variant: each data byte is XORed
/// into the low byte after the register shift.
fn crc16(data: &[u8]) -> u16 {
    const POLY: u16 = 0x1021;

    data.iter().fold(0u16, |crc, &byte| {
        let mut acc: u16 = 0;
        let mut temp = crc & 0xFF00;
        for _ in 0..8 {
            acc = if (temp ^ acc) & 0x8000 != 0 {
                (acc << 1) ^ POLY
            } else {
                acc << 1
            };
            temp <<= 1;
        }
        acc ^ (crc << 8) ^ u16::from(byte)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHT_STABLE: [u8; 14] = [
        0xF8, 0x55, 0xCE, 0x07, 0x00, 0x10, 0xD2, 0x04, 0x00, 0x00, 0x01, 0x01, 0xF0, 0x9C,
    ];
    const WEIGHT_NEGATIVE: [u8; 14] = [
        0xF8, 0x55, 0xCE, 0x07, 0x00, 0x10, 0x06, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xAF, 0xF1,
    ];
    const WEIGHT_BAD_STATUS: [u8; 14] = [
        0xF8, 0x55, 0xCE, 0x07, 0x00, 0x10, 0xDC, 0x05, 0x00, 0x00, 0x01, 0x07, 0x9C, 0x09,
    ];
    const WEIGHT_BAD_DIVISION: [u8; 14] = [
        0xF8, 0x55, 0xCE, 0x07, 0x00, 0x10, 0x0F, 0x00, 0x00, 0x00, 0x09, 0x01, 0xB5, 0xD9,
    ];
    const POLL: [u8; 34] = [
        0xF8, 0x55, 0xCE, 0x1B, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x05, 0x40, 0xE2, 0x01, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x8C, 0xD5,
    ];

    fn weight(frame: &[u8]) -> Result<Weight, ProtocolError> {
        match MassK1C.parse_response(Command::GetWeight, frame)? {
            Response::Weight(w) => Ok(w),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn crc_of_single_byte_is_the_byte() {
        assert_eq!(crc16(&[0xA0]), 0x00A0);
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn requests() {
        let request = MassK1C.build_request(Command::GetWeight, None).unwrap();
        assert_eq!(
            request.frame,
            vec![0xF8, 0x55, 0xCE, 0x01, 0x00, 0xA0, 0xA0, 0x00]
        );
        assert_eq!(request.response_len, 14);

        let request = MassK1C.build_request(Command::Info, None).unwrap();
        assert_eq!(
            request.frame,
            vec![0xF8, 0x55, 0xCE, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(request.response_len, 34);
        assert_eq!(MassK1C.handshake(Command::GetWeight), None);
    }

    #[test]
    fn stable_weight_in_grams() {
        assert_eq!(
            weight(&WEIGHT_STABLE).unwrap(),
            Weight::new(1234.0, Unit::Gram, true)
        );
    }

    #[test]
    fn negative_weight_with_100mg_division() {
        assert_eq!(
            weight(&WEIGHT_NEGATIVE).unwrap(),
            Weight::new(-25.0, Unit::Gram, false)
        );
    }

    #[test]
    fn wrong_length() {
        for len in [0, 5, 13, 15, 34] {
            let mut frame = WEIGHT_STABLE.to_vec();
            frame.resize(len, 0);
            assert_eq!(
                weight(&frame),
                Err(ProtocolError::FrameLength {
                    expected: 14,
                    received: len
                })
            );
        }
    }

    #[test]
    fn bad_header() {
        let mut frame = WEIGHT_STABLE;
        frame[1] = 0x56;
        assert!(matches!(
            weight(&frame),
            Err(ProtocolError::Framing { field: "header", .. })
        ));
    }

    #[test]
    fn bad_declared_length() {
        let mut frame = WEIGHT_STABLE;
        frame[3] = 0x08;
        assert_eq!(
            weight(&frame),
            Err(ProtocolError::Framing {
                field: "length",
                received: "8".into(),
                expected: "7".into()
            })
        );
    }

    #[test]
    fn corrupted_crc() {
        let mut frame = WEIGHT_STABLE;
        frame[13] ^= 0x01;
        assert_eq!(
            weight(&frame),
            Err(ProtocolError::Checksum {
                received: "f0:9d".into(),
                computed: "f0:9c".into()
            })
        );
    }

    #[test]
    fn poll_response_to_weight_request() {
        assert!(matches!(
            weight(&POLL),
            Err(ProtocolError::FrameLength { .. })
        ));
    }

    #[test]
    fn wrong_ack() {
        // Header, length and CRC are valid; only the ACK byte is unexpected.
        let mut body = WEIGHT_STABLE[5..12].to_vec();
        body[0] = ACK_POLL;
        let mut frame = WEIGHT_STABLE[..5].to_vec();
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&crc16(&body).to_le_bytes());

        assert_eq!(
            weight(&frame),
            Err(ProtocolError::Acknowledge {
                received: "01".into(),
                expected: "10".into()
            })
        );
    }

    #[test]
    fn unknown_status() {
        assert_eq!(
            weight(&WEIGHT_BAD_STATUS),
            Err(ProtocolError::UnknownStatus(7))
        );
    }

    #[test]
    fn unknown_division() {
        assert_eq!(
            weight(&WEIGHT_BAD_DIVISION),
            Err(ProtocolError::InvalidField {
                field: "division cost",
                received: "9".into()
            })
        );
    }

    #[test]
    fn poll_info() {
        assert_eq!(
            MassK1C.parse_response(Command::Info, &POLL),
            Ok(Response::Info(DeviceInfo {
                firmware_major: 5,
                firmware_minor: 2,
                serial_number: 123456,
            }))
        );
    }

    #[test]
    fn division_scaling() {
        assert_eq!(Division::Mg100.grams(1234), 123.4);
        assert_eq!(Division::G10.grams(-3), -30.0);
        assert_eq!(Division::Kg1.grams(2), 2000.0);
    }
}
