//! Byte reader with bounded operations.

use crate::error::{ByteError, ByteResult};

/// A bounded reader for little-endian binary data.
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of bytes remaining to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bytes to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> ByteResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> ByteResult<u16> {
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    pub fn read_u32(&mut self) -> ByteResult<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_u64(&mut self) -> ByteResult<u64> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    pub fn read_f32(&mut self) -> ByteResult<f32> {
        Ok(f32::from_le_bytes(self.read_array::<4>()?))
    }

    /// Reads a LEB128 varint `u32`.
    pub fn read_varu32(&mut self) -> ByteResult<u32> {
        let mut result = 0u32;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            if shift == 28 && byte & 0x70 != 0 {
                return Err(ByteError::InvalidVarint);
            }
            result |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ByteError::InvalidVarint)
    }

    /// Reads a zigzag varint `i32`.
    pub fn read_vars32(&mut self) -> ByteResult<i32> {
        let value = self.read_varu32()?;
        Ok(((value >> 1) as i32) ^ -((value & 1) as i32))
    }

    /// Reads exactly `len` bytes, borrowing from the underlying slice.
    pub fn read_bytes(&mut self, len: usize) -> ByteResult<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a varint length-prefixed UTF-8 string of at most `max_len` bytes.
    pub fn read_str(&mut self, max_len: usize) -> ByteResult<&'a str> {
        let len = self.read_varu32()? as usize;
        if len > max_len {
            return Err(ByteError::LengthLimit {
                length: len,
                max: max_len,
            });
        }
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| ByteError::InvalidUtf8)
    }

    fn ensure(&self, len: usize) -> ByteResult<()> {
        let available = self.remaining();
        if len > available {
            return Err(ByteError::UnexpectedEof {
                requested: len,
                available,
            });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> ByteResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reader() {
        let reader = ByteReader::new(&[]);
        assert!(reader.is_empty());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn read_from_empty_fails() {
        let mut reader = ByteReader::new(&[]);
        let result = reader.read_u8();
        assert!(matches!(result, Err(ByteError::UnexpectedEof { .. })));
    }

    #[test]
    fn read_u32_little_endian() {
        let mut reader = ByteReader::new(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert!(reader.is_empty());
    }

    #[test]
    fn read_truncated_u32_fails() {
        let mut reader = ByteReader::new(&[0x78, 0x56]);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            ByteError::UnexpectedEof {
                requested: 4,
                available: 2
            }
        );
        // Failed reads do not advance.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn read_varu32() {
        let mut reader = ByteReader::new(&[0xAC, 0x02]);
        assert_eq!(reader.read_varu32().unwrap(), 300);
    }

    #[test]
    fn read_vars32() {
        let mut reader = ByteReader::new(&[0x01, 0x04]);
        assert_eq!(reader.read_vars32().unwrap(), -1);
        assert_eq!(reader.read_vars32().unwrap(), 2);
    }

    #[test]
    fn read_varu32_invalid() {
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        let err = reader.read_varu32().unwrap_err();
        assert!(matches!(err, ByteError::InvalidVarint));
    }

    #[test]
    fn read_varu32_overflowing_fifth_byte() {
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]);
        assert!(matches!(
            reader.read_varu32(),
            Err(ByteError::InvalidVarint)
        ));
    }

    #[test]
    fn read_str_respects_limit() {
        let mut reader = ByteReader::new(&[5, b'h', b'e', b'l', b'l', b'o']);
        let err = reader.read_str(4).unwrap_err();
        assert!(matches!(err, ByteError::LengthLimit { length: 5, max: 4 }));
    }

    #[test]
    fn read_str_rejects_invalid_utf8() {
        let mut reader = ByteReader::new(&[2, 0xC3, 0x28]);
        assert_eq!(reader.read_str(16).unwrap_err(), ByteError::InvalidUtf8);
    }

    #[test]
    fn read_bytes_borrows() {
        let data = [1u8, 2, 3, 4];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
        assert_eq!(reader.remaining(), 1);
    }
}
