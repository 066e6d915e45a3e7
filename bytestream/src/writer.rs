//! Byte writer for encoding little-endian binary data.

use crate::error::{ByteError, ByteResult};

/// A growable writer for little-endian binary data.
///
/// Writes are accumulated in an internal buffer. Call [`finish`](Self::finish)
/// to get the final byte buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    /// Creates a new empty `ByteWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `ByteWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
        }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a `usize` length as a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::LengthOverflow`] if `len > u32::MAX`.
    pub fn write_len_u32(&mut self, len: usize) -> ByteResult<()> {
        let value = u32::try_from(len).map_err(|_| ByteError::LengthOverflow { length: len })?;
        self.write_u32(value);
        Ok(())
    }

    /// Writes a LEB128 varint `u32`.
    pub fn write_varu32(&mut self, mut value: u32) {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.bytes.push(byte);
            if value == 0 {
                break;
            }
        }
    }

    /// Writes a zigzag varint `i32`.
    pub fn write_vars32(&mut self, value: i32) {
        self.write_varu32(zigzag(value));
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Writes a varint length prefix followed by UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::LengthOverflow`] if the string is longer than `u32::MAX`.
    pub fn write_str(&mut self, value: &str) -> ByteResult<()> {
        let len = u32::try_from(value.len()).map_err(|_| ByteError::LengthOverflow {
            length: value.len(),
        })?;
        self.write_varu32(len);
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Finishes writing and returns the byte buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Finishes writing and appends to the provided buffer.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        buf.append(&mut self.bytes);
    }
}

/// Returns the encoded length of a varint `u32`.
#[must_use]
pub const fn varu32_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Returns the encoded length of a zigzag varint `i32`.
#[must_use]
pub const fn vars32_len(value: i32) -> usize {
    varu32_len(zigzag(value))
}

const fn zigzag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}
