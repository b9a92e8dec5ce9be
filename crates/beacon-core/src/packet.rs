//! Ping/pong framing for the discovery wire protocol.
//!
//! All multi-byte integers are little-endian. A ping is three bytes:
//! opcode, then a 16-bit sequence index. A pong echoes the sequence index
//! and appends a length-prefixed `host:port` address string; the u32
//! length prefix is authoritative and there is no terminator.

use crate::error::PacketError;

/// Opcode of a discovery request (ping).
pub const OPCODE_PING: u8 = 0x00;

/// Opcode of a discovery reply (pong).
pub const OPCODE_PONG: u8 = 0x09;

/// Minimum datagram length carrying a header; anything shorter is treated
/// as a keepalive and never answered.
pub const MIN_DATAGRAM_LEN: usize = 3;

/// Receive buffer size for discovery datagrams.
pub const MAX_DATAGRAM_LEN: usize = 2048;

/// Header view of an inbound datagram.
///
/// The responder does not branch on the opcode: any datagram long enough
/// to carry a header is answered as a discovery request. Bytes past the
/// header are left uninterpreted on the main path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Opcode byte (0 = ping, 9 = pong).
    pub opcode: u8,
    /// Sequence index, echoed verbatim in a reply.
    pub sequence: u16,
}

impl PacketHeader {
    /// Parse the three-byte header from a datagram.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TooShort`] for datagrams under three bytes.
    pub fn parse(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < MIN_DATAGRAM_LEN {
            return Err(PacketError::TooShort {
                expected: MIN_DATAGRAM_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            opcode: data[0],
            sequence: u16::from_le_bytes([data[1], data[2]]),
        })
    }
}

/// Encode a ping carrying `sequence`.
#[must_use]
pub fn encode_ping(sequence: u16) -> [u8; 3] {
    let seq = sequence.to_le_bytes();
    [OPCODE_PING, seq[0], seq[1]]
}

/// Encode a pong echoing `sequence` and announcing `address`.
#[must_use]
pub fn encode_pong(sequence: u16, address: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MIN_DATAGRAM_LEN + 4 + address.len());
    buf.push(OPCODE_PONG);
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&(address.len() as u32).to_le_bytes());
    buf.extend_from_slice(address.as_bytes());
    buf
}

/// Fully decoded pong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pong {
    /// Echoed sequence index.
    pub sequence: u16,
    /// Announced `host:port` address.
    pub address: String,
}

impl Pong {
    /// Strictly decode a pong datagram.
    ///
    /// Unlike [`PacketHeader::parse`] this checks the opcode and requires
    /// the length prefix to match the remaining payload exactly. The
    /// responder does not use this; it exists for diagnostics and tests.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TooShort`] when the header or length prefix
    /// is truncated, [`PacketError::UnexpectedOpcode`] for a non-pong
    /// opcode, [`PacketError::LengthMismatch`] when the prefix disagrees
    /// with the payload, and [`PacketError::InvalidAddress`] for
    /// non-UTF-8 address bytes.
    pub fn parse(data: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::parse(data)?;
        if header.opcode != OPCODE_PONG {
            return Err(PacketError::UnexpectedOpcode(header.opcode));
        }

        let rest = &data[MIN_DATAGRAM_LEN..];
        if rest.len() < 4 {
            return Err(PacketError::TooShort {
                expected: MIN_DATAGRAM_LEN + 4,
                actual: data.len(),
            });
        }

        let declared = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let payload = &rest[4..];
        if declared != payload.len() {
            return Err(PacketError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        let address = std::str::from_utf8(payload)?.to_string();
        Ok(Self {
            sequence: header.sequence,
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_roundtrip() {
        let bytes = encode_ping(0x1234);
        assert_eq!(bytes, [0x00, 0x34, 0x12]);

        let header = PacketHeader::parse(&bytes).unwrap();
        assert_eq!(header.opcode, OPCODE_PING);
        assert_eq!(header.sequence, 0x1234);
    }

    #[test]
    fn test_pong_wire_layout() {
        // Relay answering sequence 5 for a peer observed at 203.0.113.9,
        // remote port 7777. The address is 16 bytes long.
        let bytes = encode_pong(5, "203.0.113.9:7777");

        let mut expected = vec![0x09, 0x05, 0x00, 0x10, 0x00, 0x00, 0x00];
        expected.extend_from_slice(b"203.0.113.9:7777");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_pong_roundtrip() {
        let bytes = encode_pong(0xFFFF, "198.51.100.2:34197");
        let pong = Pong::parse(&bytes).unwrap();
        assert_eq!(pong.sequence, 0xFFFF);
        assert_eq!(pong.address, "198.51.100.2:34197");
    }

    #[test]
    fn test_short_datagram_rejected() {
        for len in 0..MIN_DATAGRAM_LEN {
            let data = vec![0u8; len];
            let err = PacketHeader::parse(&data).unwrap_err();
            assert!(matches!(
                err,
                PacketError::TooShort { expected: 3, actual } if actual == len
            ));
        }
    }

    #[test]
    fn test_header_ignores_opcode_value() {
        // The main path answers any opcode; the header parser must not
        // reject unknown ones.
        let header = PacketHeader::parse(&[0x42, 0x01, 0x00]).unwrap();
        assert_eq!(header.opcode, 0x42);
        assert_eq!(header.sequence, 1);
    }

    #[test]
    fn test_header_ignores_trailing_bytes() {
        let header = PacketHeader::parse(&[0x00, 0x05, 0x00, 0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(header.sequence, 5);
    }

    #[test]
    fn test_pong_parse_rejects_ping_opcode() {
        let bytes = encode_ping(7);
        let err = Pong::parse(&bytes).unwrap_err();
        assert!(matches!(err, PacketError::UnexpectedOpcode(OPCODE_PING)));
    }

    #[test]
    fn test_pong_parse_rejects_truncated_prefix() {
        let err = Pong::parse(&[0x09, 0x05, 0x00, 0x10, 0x00]).unwrap_err();
        assert!(matches!(err, PacketError::TooShort { .. }));
    }

    #[test]
    fn test_pong_parse_rejects_length_mismatch() {
        let mut bytes = encode_pong(5, "203.0.113.9:7777");
        // Corrupt the declared length.
        bytes[3] = bytes[3].wrapping_add(1);
        let err = Pong::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            PacketError::LengthMismatch {
                declared: 17,
                actual: 16
            }
        ));
    }

    #[test]
    fn test_pong_parse_rejects_invalid_utf8() {
        let mut bytes = vec![0x09, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        let err = Pong::parse(&bytes).unwrap_err();
        assert!(matches!(err, PacketError::InvalidAddress(_)));
    }

    #[test]
    fn test_empty_address_pong() {
        let bytes = encode_pong(0, "");
        assert_eq!(bytes, vec![0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let pong = Pong::parse(&bytes).unwrap();
        assert_eq!(pong.address, "");
    }
}
