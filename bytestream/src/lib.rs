//! Bounded little-endian byte primitives for scenepack.
//!
//! This crate provides [`ByteWriter`] and [`ByteReader`] for byte-level encoding and
//! decoding. It is designed for bounded, panic-free operation with explicit error handling.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about meshes, commands, or containers.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bytestream::{ByteReader, ByteWriter};
//!
//! let mut writer = ByteWriter::new();
//! writer.write_u32(7);
//! writer.write_vars32(-3);
//!
//! let bytes = writer.finish();
//!
//! let mut reader = ByteReader::new(&bytes);
//! assert_eq!(reader.read_u32().unwrap(), 7);
//! assert_eq!(reader.read_vars32().unwrap(), -3);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{ByteError, ByteResult};
pub use reader::ByteReader;
pub use writer::{vars32_len, varu32_len, ByteWriter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let writer = ByteWriter::new();
        let bytes = writer.finish();
        assert!(bytes.is_empty());

        let reader = ByteReader::new(&bytes);
        assert!(reader.is_empty());
    }

    #[test]
    fn mixed_roundtrip() {
        let mut writer = ByteWriter::new();
        writer.write_u8(9);
        writer.write_u16(0xBEEF);
        writer.write_f32(1.5);
        writer.write_varu32(70_000);
        writer.write_str("jelly_base").unwrap();
        writer.write_u64(u64::MAX);
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 9);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_varu32().unwrap(), 70_000);
        assert_eq!(reader.read_str(64).unwrap(), "jelly_base");
        assert_eq!(reader.read_u64().unwrap(), u64::MAX);
        assert!(reader.is_empty());
    }
}
