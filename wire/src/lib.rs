//! Container framing for scenepack.
//!
//! This crate handles the binary container layout: header, named blocks, the
//! trailing manifest, and the footer that locates it. It does not know what
//! a block body contains; the codec crate owns command encoding.
//!
//! # Design Principles
//!
//! - **Stable format** - The layout is versioned and the magic never changes.
//! - **Bounded decoding** - All length fields are validated against [`Limits`] before use.
//! - **Cross-checked** - Every block is located both by walking and by the manifest,
//!   and the two must agree exactly.

mod block;
mod container;
mod error;
mod header;
mod limits;
mod manifest;

pub use block::{
    decode_block, decode_block_header, decode_blocks, encode_block, encoded_block_len,
    BlockHeader, WireBlock, BLOCK_LENGTHS_SIZE,
};
pub use container::{decode_container, ContainerWriter, WireContainer};
pub use error::{BlockField, DecodeError, EncodeError, LimitKind, WireResult};
pub use header::{
    decode_footer, decode_header, encode_footer, encode_header, ContainerHeader, Footer,
    FOOTER_SIZE, HEADER_SIZE, MAGIC, MANIFEST_BLOCK_NAME, VERSION,
};
pub use limits::Limits;
pub use manifest::{decode_manifest, encode_manifest, Manifest, ManifestEntry};

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn public_api_exports() {
        let _ = MAGIC;
        let _ = VERSION;
        let _ = HEADER_SIZE;
        let _ = FOOTER_SIZE;
        let _ = MANIFEST_BLOCK_NAME;
        let _ = Limits::default();
        let _ = ContainerHeader::new(0);
        let _ = ContainerWriter::new();

        let _: WireResult<()> = Ok(());
    }

    #[test]
    fn header_size_constant_correct() {
        assert_eq!(
            HEADER_SIZE,
            size_of::<u32>() // magic
                + size_of::<u16>() // version
                + size_of::<u16>() // flags
                + size_of::<u32>() // block_count
        );
        assert_eq!(
            FOOTER_SIZE,
            size_of::<u32>() // manifest_offset
                + size_of::<u32>() // magic
        );
    }
}
