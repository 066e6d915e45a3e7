//! Container header, footer, and constants.

use bytestream::{ByteReader, ByteWriter};

use crate::error::{DecodeError, WireResult};

/// Magic number identifying scenepack containers.
///
/// Stored little-endian, so the first four bytes of a container read "SPKC".
/// This value is fixed and must never change across versions.
pub const MAGIC: u32 = u32::from_le_bytes(*b"SPKC");

/// Current container format version.
pub const VERSION: u16 = 1;

/// Header size in bytes: magic(4) + version(2) + flags(2) + block_count(4).
pub const HEADER_SIZE: usize = 4 + 2 + 2 + 4;

/// Footer size in bytes: manifest_offset(4) + magic(4).
pub const FOOTER_SIZE: usize = 4 + 4;

/// Name of the trailing manifest block.
pub const MANIFEST_BLOCK_NAME: &str = "@manifest";

/// Container header.
///
/// This struct represents the header fields *after* the magic number.
/// The magic number is validated separately during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Container format version.
    pub version: u16,
    /// Reserved flags; must be zero in version 1.
    pub flags: u16,
    /// Number of entity blocks (manifest excluded).
    pub block_count: u32,
}

impl ContainerHeader {
    /// Creates a header for the current version.
    #[must_use]
    pub const fn new(block_count: u32) -> Self {
        Self {
            version: VERSION,
            flags: 0,
            block_count,
        }
    }
}

/// Container footer, locating the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Byte offset of the manifest block from the start of the container.
    pub manifest_offset: u32,
}

/// Writes a container header.
pub fn encode_header(header: &ContainerHeader, writer: &mut ByteWriter) {
    writer.write_u32(MAGIC);
    writer.write_u16(header.version);
    writer.write_u16(header.flags);
    writer.write_u32(header.block_count);
}

/// Reads and validates a container header.
pub fn decode_header(reader: &mut ByteReader<'_>) -> WireResult<ContainerHeader> {
    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic { found: magic });
    }
    let version = reader.read_u16()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version });
    }
    let flags = reader.read_u16()?;
    if flags != 0 {
        return Err(DecodeError::InvalidFlags { flags });
    }
    let block_count = reader.read_u32()?;
    Ok(ContainerHeader {
        version,
        flags,
        block_count,
    })
}

/// Writes a container footer.
pub fn encode_footer(footer: &Footer, writer: &mut ByteWriter) {
    writer.write_u32(footer.manifest_offset);
    writer.write_u32(MAGIC);
}

/// Reads and validates the footer from the last [`FOOTER_SIZE`] bytes.
pub fn decode_footer(tail: &[u8]) -> WireResult<Footer> {
    let mut reader = ByteReader::new(tail);
    let manifest_offset = reader.read_u32()?;
    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(DecodeError::InvalidFooterMagic { found: magic });
    }
    Ok(Footer { manifest_offset })
}
