//! Primitive encoding/decoding for the binary format.
//!
//! Sizes use a one-byte short form below `0xFF` and the `0xFF` marker
//! followed by 8 little-endian bytes otherwise. Multi-byte scalars are
//! little-endian, assembled by shifting so the layout is host independent.

use crate::error::{Error, Result};
use crate::limits::MAX_STRING_LEN;

/// Marker byte introducing an 8-byte size.
pub const LONG_SIZE_TOKEN: u8 = 0xFF;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides bounds-checked primitive reads.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(Error::UnexpectedEof { context })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if n > self.remaining_len() {
            return Err(Error::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads `width` bytes as a little-endian unsigned integer.
    #[inline]
    fn read_le(&mut self, width: usize, context: &'static str) -> Result<u64> {
        let bytes = self.read_bytes(width, context)?;
        Ok(bytes
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i))))
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(self.read_le(2, context)? as u16)
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(self.read_le(4, context)? as u32)
    }

    pub fn read_u64(&mut self, context: &'static str) -> Result<u64> {
        self.read_le(8, context)
    }

    pub fn read_f32(&mut self, context: &'static str) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32(context)?))
    }

    pub fn read_f64(&mut self, context: &'static str) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64(context)?))
    }

    /// Reads a size in the short/long escape encoding.
    ///
    /// The long form must not encode a value that fits the short form.
    pub fn read_size(&mut self, context: &'static str) -> Result<u64> {
        let first = self.read_byte(context)?;
        if first < LONG_SIZE_TOKEN {
            return Ok(u64::from(first));
        }
        let size = self.read_u64(context)?;
        if size < u64::from(LONG_SIZE_TOKEN) {
            return Err(Error::Malformed {
                context: "non-canonical long size",
            });
        }
        Ok(size)
    }

    /// Reads a size-prefixed UTF-8 string.
    pub fn read_string(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_size(field)?;
        if len > MAX_STRING_LEN as u64 {
            return Err(Error::LengthExceedsLimit {
                field,
                len,
                max: MAX_STRING_LEN as u64,
            });
        }
        let bytes = self.read_bytes(len as usize, field)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| Error::InvalidUtf8 { field })
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes the low `width` bytes of `value`, least significant first.
    #[inline]
    fn write_le(&mut self, value: u64, width: usize) {
        for i in 0..width {
            self.buf.push((value >> (8 * i)) as u8);
        }
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_le(u64::from(value), 2);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_le(u64::from(value), 4);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_le(value, 8);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    /// Writes a size in the short/long escape encoding.
    pub fn write_size(&mut self, size: u64) {
        if size < u64::from(LONG_SIZE_TOKEN) {
            self.buf.push(size as u8);
        } else {
            self.buf.push(LONG_SIZE_TOKEN);
            self.write_u64(size);
        }
    }

    /// Writes a size-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        self.write_size(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }
}
