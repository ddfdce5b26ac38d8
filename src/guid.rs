//! GUID values and their 16-byte wire layout.
//!
//! The wire layout is the .NET/Windows "mixed-endian" one: `Data1` (4 bytes) little-endian,
//! `Data2` and `Data3` (2 bytes each) little-endian, then the remaining 8 bytes as-is.
//! [`Guid`] keeps its bytes in text order (the order the hex digits appear in
//! `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`) and converts on the way to and from the wire.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;
use std::str::FromStr;

/// Encoded size of a GUID.
pub const GUID_SIZE: usize = 16;

/// A 128-bit globally unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    bytes: [u8; GUID_SIZE],
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuidParseError {
    #[error("GUID must be 32 hex digits or 36 characters with hyphens, got {0} characters")]
    InvalidLength(usize),
    #[error("invalid hex digit {ch:?} at index {index}")]
    InvalidDigit { ch: char, index: usize },
    #[error("expected '-' at index {0}")]
    MissingHyphen(usize),
}

/// Hyphen positions in the 36-character form.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

impl Guid {
    /// The all-zero GUID.
    pub const NIL: Guid = Guid { bytes: [0; GUID_SIZE] };

    /// Build from bytes in text order.
    pub const fn from_bytes(bytes: [u8; GUID_SIZE]) -> Self {
        Guid { bytes }
    }

    /// Build from the four .NET fields.
    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut bytes = [0u8; GUID_SIZE];
        BigEndian::write_u32(&mut bytes[0..4], data1);
        BigEndian::write_u16(&mut bytes[4..6], data2);
        BigEndian::write_u16(&mut bytes[6..8], data3);
        bytes[8..].copy_from_slice(&data4);
        Guid { bytes }
    }

    /// Bytes in text order.
    pub fn as_bytes(&self) -> &[u8; GUID_SIZE] {
        &self.bytes
    }

    pub fn data1(&self) -> u32 {
        BigEndian::read_u32(&self.bytes[0..4])
    }

    pub fn data2(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[4..6])
    }

    pub fn data3(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[6..8])
    }

    pub fn is_nil(&self) -> bool {
        self.bytes == [0; GUID_SIZE]
    }

    /// Bytes as they appear on the wire.
    pub fn to_wire_bytes(&self) -> [u8; GUID_SIZE] {
        let mut out = [0u8; GUID_SIZE];
        LittleEndian::write_u32(&mut out[0..4], self.data1());
        LittleEndian::write_u16(&mut out[4..6], self.data2());
        LittleEndian::write_u16(&mut out[6..8], self.data3());
        out[8..].copy_from_slice(&self.bytes[8..]);
        out
    }

    /// Inverse of [`Guid::to_wire_bytes`].
    pub fn from_wire_bytes(wire: &[u8; GUID_SIZE]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&wire[8..]);
        Guid::from_fields(
            LittleEndian::read_u32(&wire[0..4]),
            LittleEndian::read_u16(&wire[4..6]),
            LittleEndian::read_u16(&wire[6..8]),
            data4,
        )
    }
}

fn hex_value(ch: char, index: usize) -> Result<u8, GuidParseError> {
    ch.to_digit(16)
        .map(|d| d as u8)
        .ok_or(GuidParseError::InvalidDigit { ch, index })
}

impl FromStr for Guid {
    type Err = GuidParseError;

    /// Accepts `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` or 32 bare hex digits, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        let hyphenated = match chars.len() {
            36 => true,
            32 => false,
            n => return Err(GuidParseError::InvalidLength(n)),
        };
        let mut bytes = [0u8; GUID_SIZE];
        let mut nibble = 0usize;
        for (index, &ch) in chars.iter().enumerate() {
            if hyphenated && HYPHENS.contains(&index) {
                if ch != '-' {
                    return Err(GuidParseError::MissingHyphen(index));
                }
                continue;
            }
            let v = hex_value(ch, index)?;
            bytes[nibble / 2] |= if nibble % 2 == 0 { v << 4 } else { v };
            nibble += 1;
        }
        Ok(Guid { bytes })
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i == 4 || i == 6 || i == 8 || i == 10 {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_case_parses_to_lowercase() {
        let g: Guid = "A1B2C3D4-E5F6-7890-ABCD-EF1234567890".parse().unwrap();
        assert_eq!(g.to_string(), "a1b2c3d4-e5f6-7890-abcd-ef1234567890");
    }

    #[test]
    fn wire_layout_is_mixed_endian() {
        let g: Guid = "12345678-1234-1234-1234-123456789abc".parse().unwrap();
        assert_eq!(
            g.to_wire_bytes(),
            [
                0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x34, 0x12, 0x12, 0x34, 0x12, 0x34, 0x56, 0x78,
                0x9a, 0xbc
            ]
        );
        assert_eq!(Guid::from_wire_bytes(&g.to_wire_bytes()), g);
    }

    #[test]
    fn bare_hex_form() {
        let a: Guid = "0123456701230123012301234567890a".parse().unwrap();
        let b: Guid = "01234567-0123-0123-0123-01234567890a".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.data1(), 0x01234567);
        assert_eq!(a.data2(), 0x0123);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("abc".parse::<Guid>(), Err(GuidParseError::InvalidLength(3)));
        assert!(matches!(
            "g1234567-0123-0123-0123-01234567890a".parse::<Guid>(),
            Err(GuidParseError::InvalidDigit { ch: 'g', index: 0 })
        ));
        assert_eq!(
            "01234567+0123-0123-0123-01234567890a".parse::<Guid>(),
            Err(GuidParseError::MissingHyphen(8))
        );
    }
}
