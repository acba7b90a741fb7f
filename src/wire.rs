//! Protobuf wire-format primitives.
//!
//! klib metadata is protobuf-serialized; this module implements the wire
//! layer the decoder in [`crate::metadata`] is built on: varints, tags, and
//! length-delimited fields. Unknown fields can be skipped, so a library
//! produced by a newer toolchain that only *adds* fields still decodes.
//!
//! [`Writer`] mirrors [`Reader`] and exists so tests can author fixture
//! libraries byte-for-byte.

use std::fmt;

/// Varint-encoded scalar.
pub const WIRE_VARINT: u8 = 0;
/// Fixed 64-bit scalar (skipped, never produced by the subset we read).
pub const WIRE_FIXED64: u8 = 1;
/// Length-delimited bytes: strings and nested messages.
pub const WIRE_LEN: u8 = 2;
/// Fixed 32-bit scalar (skipped, never produced by the subset we read).
pub const WIRE_FIXED32: u8 = 5;

/// Structural failures at the wire layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input ended inside a varint, tag, or length-delimited payload.
    Truncated,
    /// Varint ran past 10 bytes and cannot fit a u64.
    VarintOverflow,
    /// Tag carried a wire type this format never uses.
    UnsupportedWireType(u8),
    /// Tag carried field number zero, which protobuf reserves.
    ZeroFieldNumber,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated => write!(f, "input truncated"),
            WireError::VarintOverflow => write!(f, "varint exceeds 64 bits"),
            WireError::UnsupportedWireType(t) => write!(f, "unsupported wire type {}", t),
            WireError::ZeroFieldNumber => write!(f, "field number must be non-zero"),
        }
    }
}

impl std::error::Error for WireError {}

/// Cursor over one serialized message.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = *self.buf.get(self.pos).ok_or(WireError::Truncated)?;
            self.pos += 1;
            if shift == 63 && byte > 1 {
                return Err(WireError::VarintOverflow);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(WireError::VarintOverflow);
            }
        }
    }

    /// Reads a field tag, returning `(field_number, wire_type)`.
    pub fn read_tag(&mut self) -> Result<(u32, u8), WireError> {
        let tag = self.read_varint()?;
        let field = (tag >> 3) as u32;
        if field == 0 {
            return Err(WireError::ZeroFieldNumber);
        }
        Ok((field, (tag & 0x7) as u8))
    }

    pub fn read_len_delimited(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_varint()? as usize;
        let end = self.pos.checked_add(len).ok_or(WireError::Truncated)?;
        if end > self.buf.len() {
            return Err(WireError::Truncated);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_len_delimited()?;
        // Names in klib metadata are UTF-8; anything else is corrupt input,
        // surfaced as truncation-grade structural failure.
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::Truncated)
    }

    /// Skips over one field payload of the given wire type.
    pub fn skip(&mut self, wire_type: u8) -> Result<(), WireError> {
        match wire_type {
            WIRE_VARINT => {
                self.read_varint()?;
            }
            WIRE_LEN => {
                self.read_len_delimited()?;
            }
            WIRE_FIXED64 => self.advance(8)?,
            WIRE_FIXED32 => self.advance(4)?,
            other => return Err(WireError::UnsupportedWireType(other)),
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<(), WireError> {
        let end = self.pos.checked_add(n).ok_or(WireError::Truncated)?;
        if end > self.buf.len() {
            return Err(WireError::Truncated);
        }
        self.pos = end;
        Ok(())
    }
}

/// Serializer counterpart of [`Reader`]; fixture-authoring only.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn varint(&mut self, field: u32, value: u64) -> &mut Self {
        self.tag(field, WIRE_VARINT);
        self.raw_varint(value);
        self
    }

    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        self.tag(field, WIRE_LEN);
        self.raw_varint(value.len() as u64);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn tag(&mut self, field: u32, wire_type: u8) {
        self.raw_varint((u64::from(field) << 3) | u64::from(wire_type));
    }

    fn raw_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }
}
