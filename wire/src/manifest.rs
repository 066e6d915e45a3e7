//! Manifest: the index of entity blocks stored at the end of a container.

use bytestream::{ByteReader, ByteWriter};

use crate::block::length_overflow;
use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::limits::Limits;

/// Index entry describing one entity block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    /// Offset of the block from the start of the container.
    pub offset: u32,
    pub uncompressed_len: u32,
    pub compressed_len: u32,
    /// Digest of the uncompressed block body.
    pub digest: u64,
}

/// Ordered list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by block name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

/// Encodes the uncompressed manifest body.
pub fn encode_manifest(manifest: &Manifest) -> Result<Vec<u8>, EncodeError> {
    let mut writer = ByteWriter::with_capacity(4 + manifest.entries.len() * 32);
    let count = u32::try_from(manifest.entries.len()).map_err(|_| EncodeError::LengthOverflow {
        length: manifest.entries.len(),
    })?;
    writer.write_varu32(count);
    for entry in &manifest.entries {
        writer.write_str(&entry.name).map_err(length_overflow)?;
        writer.write_u32(entry.offset);
        writer.write_u32(entry.uncompressed_len);
        writer.write_u32(entry.compressed_len);
        writer.write_u64(entry.digest);
    }
    Ok(writer.finish())
}

/// Decodes an uncompressed manifest body.
///
/// Entry offsets must be strictly increasing; the body must be consumed exactly.
pub fn decode_manifest(body: &[u8], limits: &Limits) -> WireResult<Manifest> {
    let mut reader = ByteReader::new(body);
    let count = reader.read_varu32()? as usize;
    if count > limits.max_blocks {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::BlockCount,
            limit: limits.max_blocks,
            actual: count,
        });
    }

    // Each entry is at least 21 bytes, so cap the preallocation by what remains.
    let mut entries = Vec::with_capacity(count.min(reader.remaining() / 21));
    let mut previous: Option<u32> = None;
    for index in 0..count {
        let name = reader.read_str(limits.max_name_len)?.to_owned();
        let offset = reader.read_u32()?;
        let uncompressed_len = reader.read_u32()?;
        let compressed_len = reader.read_u32()?;
        let digest = reader.read_u64()?;

        if let Some(prev) = previous {
            if offset <= prev {
                return Err(DecodeError::BlockOffsetMismatch {
                    index,
                    declared: offset,
                    actual: prev as usize,
                });
            }
        }
        previous = Some(offset);

        entries.push(ManifestEntry {
            name,
            offset,
            uncompressed_len,
            compressed_len,
            digest,
        });
    }

    if !reader.is_empty() {
        return Err(DecodeError::TrailingData {
            expected_end: reader.position(),
            actual_end: body.len(),
        });
    }
    Ok(Manifest { entries })
}
