//! Block framing: name, lengths, and compressed payload.

use bytestream::{ByteError, ByteReader, ByteWriter};

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::limits::Limits;

/// Fixed-size fields following the block name: uncompressed_len(4) + compressed_len(4).
pub const BLOCK_LENGTHS_SIZE: usize = 4 + 4;

/// Header of a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader<'a> {
    pub name: &'a str,
    pub uncompressed_len: u32,
    pub compressed_len: u32,
}

/// A block within a container, borrowing its compressed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireBlock<'a> {
    /// Offset of the block's first byte from the start of the container.
    pub offset: usize,
    pub name: &'a str,
    pub uncompressed_len: u32,
    pub compressed: &'a [u8],
}

impl WireBlock<'_> {
    /// Number of bytes this block occupies in the container.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        encoded_block_len(self.name, self.compressed.len())
    }
}

/// Number of bytes a block with this name and payload length occupies.
#[must_use]
pub fn encoded_block_len(name: &str, compressed_len: usize) -> usize {
    let name_len = u32::try_from(name.len()).unwrap_or(u32::MAX);
    bytestream::varu32_len(name_len) + name.len() + BLOCK_LENGTHS_SIZE + compressed_len
}

/// Writes a block header followed by its compressed payload.
pub fn encode_block(
    name: &str,
    uncompressed_len: usize,
    compressed: &[u8],
    writer: &mut ByteWriter,
) -> Result<(), EncodeError> {
    writer.write_str(name).map_err(length_overflow)?;
    writer
        .write_len_u32(uncompressed_len)
        .map_err(length_overflow)?;
    writer
        .write_len_u32(compressed.len())
        .map_err(length_overflow)?;
    writer.write_bytes(compressed);
    Ok(())
}

/// Reads a block header, enforcing name and size limits.
pub fn decode_block_header<'a>(
    reader: &mut ByteReader<'a>,
    limits: &Limits,
) -> WireResult<BlockHeader<'a>> {
    let name = reader.read_str(limits.max_name_len).map_err(|err| match err {
        ByteError::LengthLimit { length, max } => DecodeError::LimitsExceeded {
            kind: LimitKind::NameLength,
            limit: max,
            actual: length,
        },
        other => DecodeError::Framing(other),
    })?;
    let uncompressed_len = reader.read_u32()?;
    check_block_len(uncompressed_len, limits)?;
    let compressed_len = reader.read_u32()?;
    check_block_len(compressed_len, limits)?;
    Ok(BlockHeader {
        name,
        uncompressed_len,
        compressed_len,
    })
}

/// Reads one block; `base` is the container offset of the reader's start.
pub fn decode_block<'a>(
    reader: &mut ByteReader<'a>,
    base: usize,
    limits: &Limits,
) -> WireResult<WireBlock<'a>> {
    let offset = base + reader.position();
    let header = decode_block_header(reader, limits)?;
    let compressed = reader.read_bytes(header.compressed_len as usize)?;
    Ok(WireBlock {
        offset,
        name: header.name,
        uncompressed_len: header.uncompressed_len,
        compressed,
    })
}

/// Walks a region made only of blocks, returning them in order.
///
/// `base` is the container offset of `region[0]`. The region must end exactly
/// at a block boundary.
pub fn decode_blocks<'a>(
    region: &'a [u8],
    base: usize,
    limits: &Limits,
) -> WireResult<Vec<WireBlock<'a>>> {
    let mut reader = ByteReader::new(region);
    let mut blocks = Vec::new();
    while !reader.is_empty() {
        if blocks.len() >= limits.max_blocks {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::BlockCount,
                limit: limits.max_blocks,
                actual: blocks.len() + 1,
            });
        }
        blocks.push(decode_block(&mut reader, base, limits)?);
    }
    Ok(blocks)
}

fn check_block_len(len: u32, limits: &Limits) -> WireResult<()> {
    let len = len as usize;
    if len > limits.max_block_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::BlockBytes,
            limit: limits.max_block_bytes,
            actual: len,
        });
    }
    Ok(())
}

pub(crate) fn length_overflow(err: ByteError) -> EncodeError {
    match err {
        ByteError::LengthOverflow { length } => EncodeError::LengthOverflow { length },
        _ => EncodeError::LengthOverflow { length: usize::MAX },
    }
}
