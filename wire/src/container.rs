//! Whole-container encoding and validated decoding.

use bytestream::{ByteReader, ByteWriter};

use crate::block::{decode_block, decode_blocks, encode_block, encoded_block_len, WireBlock};
use crate::error::{BlockField, DecodeError, EncodeError, LimitKind, WireResult};
use crate::header::{
    decode_footer, decode_header, encode_footer, encode_header, ContainerHeader, Footer,
    FOOTER_SIZE, HEADER_SIZE, MANIFEST_BLOCK_NAME,
};
use crate::limits::Limits;
use crate::manifest::{decode_manifest, encode_manifest, Manifest, ManifestEntry};

/// Builds a container block by block, then appends the manifest and footer.
#[derive(Debug, Default)]
pub struct ContainerWriter {
    blocks: ByteWriter,
    manifest: Manifest,
}

impl ContainerWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks pushed so far.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.manifest.entries.len()
    }

    /// Appends an already-compressed entity block.
    ///
    /// `digest` is recorded in the manifest and should cover the uncompressed body.
    pub fn push_block(
        &mut self,
        name: &str,
        uncompressed_len: usize,
        compressed: &[u8],
        digest: u64,
    ) -> Result<(), EncodeError> {
        let offset = HEADER_SIZE + self.blocks.len();
        encode_block(name, uncompressed_len, compressed, &mut self.blocks)?;
        self.manifest.entries.push(ManifestEntry {
            name: name.to_string(),
            offset: to_u32(offset)?,
            uncompressed_len: to_u32(uncompressed_len)?,
            compressed_len: to_u32(compressed.len())?,
            digest,
        });
        Ok(())
    }

    /// Writes header, blocks, manifest block, and footer.
    pub fn finish(self) -> Result<Vec<u8>, EncodeError> {
        let body = encode_manifest(&self.manifest)?;
        let compressed = buffer::deflate(&body).map_err(EncodeError::Compression)?;
        let manifest_offset = HEADER_SIZE + self.blocks.len();
        let total = manifest_offset
            + encoded_block_len(MANIFEST_BLOCK_NAME, compressed.len())
            + FOOTER_SIZE;

        let mut writer = ByteWriter::with_capacity(total);
        encode_header(
            &ContainerHeader::new(to_u32(self.manifest.entries.len())?),
            &mut writer,
        );
        writer.write_bytes(&self.blocks.finish());
        encode_block(MANIFEST_BLOCK_NAME, body.len(), &compressed, &mut writer)?;
        encode_footer(
            &Footer {
                manifest_offset: to_u32(manifest_offset)?,
            },
            &mut writer,
        );
        Ok(writer.finish())
    }
}

/// A decoded container: header, manifest, and borrowed entity blocks.
///
/// `blocks[i]` corresponds to `manifest.entries[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WireContainer<'a> {
    pub header: ContainerHeader,
    pub manifest: Manifest,
    pub blocks: Vec<WireBlock<'a>>,
}

/// Decodes and cross-checks a container.
///
/// Block payloads are returned compressed; inflating them and checking their
/// digests is left to the caller.
pub fn decode_container<'a>(bytes: &'a [u8], limits: &Limits) -> WireResult<WireContainer<'a>> {
    let required = HEADER_SIZE + FOOTER_SIZE;
    if bytes.len() < required {
        return Err(DecodeError::ContainerTooSmall {
            actual: bytes.len(),
            required,
        });
    }
    if bytes.len() > limits.max_container_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::ContainerBytes,
            limit: limits.max_container_bytes,
            actual: bytes.len(),
        });
    }

    let header = decode_header(&mut ByteReader::new(&bytes[..HEADER_SIZE]))?;
    if header.block_count as usize > limits.max_blocks {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::BlockCount,
            limit: limits.max_blocks,
            actual: header.block_count as usize,
        });
    }

    let footer_start = bytes.len() - FOOTER_SIZE;
    let footer = decode_footer(&bytes[footer_start..])?;
    let manifest_offset = footer.manifest_offset as usize;
    if manifest_offset < HEADER_SIZE || manifest_offset >= footer_start {
        return Err(DecodeError::InvalidManifestOffset {
            offset: footer.manifest_offset,
            container_len: bytes.len(),
        });
    }

    let manifest = read_manifest(bytes, manifest_offset, footer_start, limits)?;
    if manifest.entries.len() != header.block_count as usize {
        return Err(DecodeError::BlockCountMismatch {
            header: header.block_count,
            manifest: manifest.entries.len(),
        });
    }

    let blocks = decode_blocks(&bytes[HEADER_SIZE..manifest_offset], HEADER_SIZE, limits)?;
    for (index, entry) in manifest.entries.iter().enumerate() {
        // A missing block would have started where the manifest does.
        let actual = blocks.get(index).map_or(manifest_offset, |block| block.offset);
        if entry.offset as usize != actual {
            return Err(DecodeError::BlockOffsetMismatch {
                index,
                declared: entry.offset,
                actual,
            });
        }
        if let Some(block) = blocks.get(index) {
            check_entry(index, entry, block)?;
        }
    }

    if blocks.len() != manifest.entries.len() {
        let blocks_end = blocks
            .get(manifest.entries.len())
            .map_or(manifest_offset, |block| block.offset);
        return Err(DecodeError::BlockRegionMismatch {
            blocks_end,
            manifest_offset: footer.manifest_offset,
        });
    }

    Ok(WireContainer {
        header,
        manifest,
        blocks,
    })
}

fn read_manifest(
    bytes: &[u8],
    manifest_offset: usize,
    footer_start: usize,
    limits: &Limits,
) -> WireResult<Manifest> {
    let mut reader = ByteReader::new(&bytes[manifest_offset..footer_start]);
    let block = decode_block(&mut reader, manifest_offset, limits)?;
    if block.name != MANIFEST_BLOCK_NAME {
        return Err(DecodeError::ManifestName {
            found: block.name.to_string(),
        });
    }
    if !reader.is_empty() {
        return Err(DecodeError::TrailingData {
            expected_end: footer_start,
            actual_end: manifest_offset + reader.position(),
        });
    }
    let body = buffer::inflate(block.compressed, block.uncompressed_len as usize)
        .map_err(DecodeError::ManifestBody)?;
    decode_manifest(&body, limits)
}

fn check_entry(index: usize, entry: &ManifestEntry, block: &WireBlock<'_>) -> WireResult<()> {
    let field = if block.name != entry.name {
        Some(BlockField::Name)
    } else if block.uncompressed_len != entry.uncompressed_len {
        Some(BlockField::UncompressedLen)
    } else if block.compressed.len() != entry.compressed_len as usize {
        Some(BlockField::CompressedLen)
    } else {
        None
    };
    match field {
        Some(field) => Err(DecodeError::BlockHeaderMismatch { index, field }),
        None => Ok(()),
    }
}

fn to_u32(value: usize) -> Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::LengthOverflow { length: value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MAGIC;

    fn sample() -> Vec<u8> {
        let mut writer = ContainerWriter::new();
        let jelly = buffer::deflate(b"jelly body").unwrap();
        let marbles = buffer::deflate(b"marbles body!").unwrap();
        writer
            .push_block("jelly_base", 10, &jelly, buffer::digest(b"jelly body"))
            .unwrap();
        writer
            .push_block(
                "marbles_base",
                13,
                &marbles,
                buffer::digest(b"marbles body!"),
            )
            .unwrap();
        writer.finish().unwrap()
    }

    fn manifest_offset(bytes: &[u8]) -> usize {
        let tail = &bytes[bytes.len() - FOOTER_SIZE..];
        u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]) as usize
    }

    #[test]
    fn empty_container_roundtrip() {
        let bytes = ContainerWriter::new().finish().unwrap();
        assert_eq!(&bytes[..4], b"SPKC");
        let container = decode_container(&bytes, &Limits::for_testing()).unwrap();
        assert_eq!(container.header.block_count, 0);
        assert!(container.blocks.is_empty());
        assert!(container.manifest.is_empty());
        assert_eq!(manifest_offset(&bytes), HEADER_SIZE);
    }

    #[test]
    fn container_roundtrip() {
        let bytes = sample();
        let container = decode_container(&bytes, &Limits::for_testing()).unwrap();
        assert_eq!(container.header.block_count, 2);
        assert_eq!(container.blocks.len(), 2);
        assert_eq!(container.blocks[0].name, "jelly_base");
        assert_eq!(container.blocks[0].offset, HEADER_SIZE);
        let inflated = buffer::inflate(container.blocks[1].compressed, 13).unwrap();
        assert_eq!(inflated, b"marbles body!");
        assert_eq!(
            container.manifest.entries[1].digest,
            buffer::digest(b"marbles body!")
        );
    }

    #[test]
    fn footer_magic_checked() {
        let mut bytes = sample();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = decode_container(&bytes, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFooterMagic { .. }));
    }

    #[test]
    fn too_small_rejected() {
        let err = decode_container(&MAGIC.to_le_bytes(), &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::ContainerTooSmall { .. }));
    }

    #[test]
    fn container_size_limit() {
        let bytes = sample();
        let limits = Limits {
            max_container_bytes: bytes.len() - 1,
            ..Limits::for_testing()
        };
        let err = decode_container(&bytes, &limits).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::ContainerBytes,
                ..
            }
        ));
    }

    #[test]
    fn manifest_offset_out_of_range() {
        let mut bytes = sample();
        let at = bytes.len() - FOOTER_SIZE;
        bytes[at..at + 4].copy_from_slice(&2u32.to_le_bytes());
        let err = decode_container(&bytes, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidManifestOffset { .. }));
    }

    #[test]
    fn manifest_offset_pointing_at_entity_block() {
        let mut bytes = sample();
        let at = bytes.len() - FOOTER_SIZE;
        bytes[at..at + 4].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        let err = decode_container(&bytes, &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ManifestName {
                found: "jelly_base".to_string()
            }
        );
    }

    #[test]
    fn block_count_mismatch_detected() {
        let mut bytes = sample();
        bytes[8..12].copy_from_slice(&3u32.to_le_bytes());
        let err = decode_container(&bytes, &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BlockCountMismatch {
                header: 3,
                manifest: 2
            }
        );
    }

    #[test]
    fn renamed_block_detected() {
        let mut bytes = sample();
        // First block name starts after its one-byte length prefix.
        bytes[HEADER_SIZE + 1] = b'J';
        let err = decode_container(&bytes, &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BlockHeaderMismatch {
                index: 0,
                field: BlockField::Name
            }
        );
    }

    #[test]
    fn unlisted_block_detected() {
        let bytes = sample();
        let offset = manifest_offset(&bytes);
        let mut stray = ByteWriter::new();
        encode_block("stray", 1, &[0], &mut stray).unwrap();

        let mut forged = bytes[..offset].to_vec();
        forged.extend_from_slice(&stray.finish());
        let moved = forged.len() as u32;
        forged.extend_from_slice(&bytes[offset..]);
        let at = forged.len() - FOOTER_SIZE;
        forged[at..at + 4].copy_from_slice(&moved.to_le_bytes());

        let err = decode_container(&forged, &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BlockRegionMismatch {
                blocks_end: offset,
                manifest_offset: moved
            }
        );
    }

    #[test]
    fn damaged_manifest_detected() {
        let mut bytes = sample();
        let offset = manifest_offset(&bytes);
        let payload = offset + encoded_block_len(MANIFEST_BLOCK_NAME, 0);
        bytes[payload + 2] ^= 0x40;
        let err = decode_container(&bytes, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::ManifestBody(_)));
    }

    #[test]
    fn every_truncation_rejected() {
        let bytes = sample();
        for len in 0..bytes.len() {
            assert!(
                decode_container(&bytes[..len], &Limits::for_testing()).is_err(),
                "truncation to {len} bytes accepted"
            );
        }
    }
}
