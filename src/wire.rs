//! Minimal protobuf wire-format reader.
//!
//! The tile encoding is a nested length-delimited protobuf structure, walked
//! in a single linear pass with no backtracking. This module provides the
//! cursor primitives the parser is built from: varints, field keys,
//! length-delimited sub-slices and unknown-field skipping.

use crate::error::ParseError;

/// Wire types as defined by the protobuf encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u8) -> Result<Self, ParseError> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(ParseError::InvalidWireType(other)),
        }
    }
}

/// A non-owning cursor over a message's bytes.
///
/// Sub-messages are read by taking a length-delimited sub-slice and wrapping
/// it in a fresh reader, so nesting never copies.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        WireReader { buf, pos: 0 }
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads the next field key, returning the field number and wire type.
    pub(crate) fn read_key(&mut self) -> Result<(u32, WireType), ParseError> {
        let key = self.read_varint()?;
        let wire_type = WireType::from_bits((key & 0x7) as u8)?;
        Ok(((key >> 3) as u32, wire_type))
    }

    /// Reads a base-128 varint of at most 64 bits.
    pub(crate) fn read_varint(&mut self) -> Result<u64, ParseError> {
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(ParseError::InvalidVarint)?;
            self.pos += 1;
            if shift == 63 && byte > 1 {
                return Err(ParseError::InvalidVarint);
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(ParseError::InvalidVarint);
            }
        }
    }

    /// Reads a length-delimited field as a sub-slice of the input.
    pub(crate) fn read_bytes(&mut self) -> Result<&'a [u8], ParseError> {
        let len = self.read_varint()? as usize;
        if len > self.remaining() {
            return Err(ParseError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a length-delimited UTF-8 string; invalid sequences are replaced
    /// rather than rejected (forward compatibility).
    pub(crate) fn read_string(&mut self) -> Result<String, ParseError> {
        Ok(String::from_utf8_lossy(self.read_bytes()?).into_owned())
    }

    pub(crate) fn read_fixed32(&mut self) -> Result<u32, ParseError> {
        if self.remaining() < 4 {
            return Err(ParseError::Truncated {
                needed: 4,
                remaining: self.remaining(),
            });
        }
        let bytes: [u8; 4] = self.buf[self.pos..self.pos + 4].try_into().unwrap();
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    pub(crate) fn read_fixed64(&mut self) -> Result<u64, ParseError> {
        if self.remaining() < 8 {
            return Err(ParseError::Truncated {
                needed: 8,
                remaining: self.remaining(),
            });
        }
        let bytes: [u8; 8] = self.buf[self.pos..self.pos + 8].try_into().unwrap();
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads a packed repeated uint32 field into `out`.
    pub(crate) fn read_packed_u32(&mut self, out: &mut Vec<u32>) -> Result<(), ParseError> {
        let mut sub = WireReader::new(self.read_bytes()?);
        while sub.has_remaining() {
            out.push(sub.read_varint()? as u32);
        }
        Ok(())
    }

    /// Skips over a field of the given wire type. Unknown fields at any
    /// nesting level are skipped rather than rejected.
    pub(crate) fn skip(&mut self, wire_type: WireType) -> Result<(), ParseError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.read_fixed64()?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::Fixed32 => {
                self.read_fixed32()?;
            }
        }
        Ok(())
    }
}
