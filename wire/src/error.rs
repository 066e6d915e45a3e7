//! Error types for container framing.

use std::fmt;

use buffer::BufferError;
use bytestream::ByteError;

/// Result type for container decoding.
pub type WireResult<T> = Result<T, DecodeError>;

/// Decode errors for container framing.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Container is too small to hold a header and footer.
    ContainerTooSmall { actual: usize, required: usize },

    /// Invalid magic number in the container header.
    InvalidMagic { found: u32 },

    /// Invalid magic number in the container footer.
    InvalidFooterMagic { found: u32 },

    /// Unsupported container version.
    UnsupportedVersion { found: u16 },

    /// Reserved flag bits are set.
    InvalidFlags { flags: u16 },

    /// Footer points outside the block region.
    InvalidManifestOffset { offset: u32, container_len: usize },

    /// The block at the manifest offset is not the manifest.
    ManifestName { found: String },

    /// The manifest block failed to inflate.
    ManifestBody(BufferError),

    /// Bytes remain between the manifest block and the footer.
    TrailingData { expected_end: usize, actual_end: usize },

    /// Header block count disagrees with the manifest.
    BlockCountMismatch { header: u32, manifest: usize },

    /// A manifest entry's offset does not match where its block starts.
    BlockOffsetMismatch {
        index: usize,
        declared: u32,
        actual: usize,
    },

    /// A block header disagrees with its manifest entry.
    BlockHeaderMismatch { index: usize, field: BlockField },

    /// Blocks do not end exactly where the manifest begins.
    BlockRegionMismatch { blocks_end: usize, manifest_offset: u32 },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Low-level framing error (truncation, bad varint, bad UTF-8).
    Framing(ByteError),
}

/// Block header field that disagreed with the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockField {
    Name,
    UncompressedLen,
    CompressedLen,
}

/// Specific container limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    ContainerBytes,
    BlockCount,
    BlockBytes,
    NameLength,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A length or offset does not fit in a `u32`.
    LengthOverflow { length: usize },
    /// The manifest could not be compressed.
    Compression(BufferError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerTooSmall { actual, required } => {
                write!(
                    f,
                    "container too small: {actual} bytes, need at least {required}"
                )
            }
            Self::InvalidMagic { found } => {
                write!(f, "invalid magic number: 0x{found:08X}")
            }
            Self::InvalidFooterMagic { found } => {
                write!(f, "invalid footer magic number: 0x{found:08X}")
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported container version: {found}")
            }
            Self::InvalidFlags { flags } => {
                write!(f, "invalid flags: 0x{flags:04X}")
            }
            Self::InvalidManifestOffset {
                offset,
                container_len,
            } => {
                write!(
                    f,
                    "manifest offset {offset} outside block region of {container_len}-byte container"
                )
            }
            Self::ManifestName { found } => {
                write!(f, "expected manifest block, found block {found:?}")
            }
            Self::ManifestBody(err) => write!(f, "manifest body: {err}"),
            Self::TrailingData {
                expected_end,
                actual_end,
            } => {
                write!(
                    f,
                    "manifest ends at {actual_end} but footer starts at {expected_end}"
                )
            }
            Self::BlockCountMismatch { header, manifest } => {
                write!(
                    f,
                    "header declares {header} blocks but manifest lists {manifest}"
                )
            }
            Self::BlockOffsetMismatch {
                index,
                declared,
                actual,
            } => {
                write!(
                    f,
                    "block {index} declared at offset {declared} but starts at {actual}"
                )
            }
            Self::BlockHeaderMismatch { index, field } => {
                write!(f, "block {index} {field} disagrees with manifest")
            }
            Self::BlockRegionMismatch {
                blocks_end,
                manifest_offset,
            } => {
                write!(
                    f,
                    "blocks end at {blocks_end} but manifest starts at {manifest_offset}"
                )
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::Framing(err) => write!(f, "framing error: {err}"),
        }
    }
}

impl fmt::Display for BlockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::UncompressedLen => "uncompressed length",
            Self::CompressedLen => "compressed length",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContainerBytes => "container bytes",
            Self::BlockCount => "block count",
            Self::BlockBytes => "block bytes",
            Self::NameLength => "name length",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthOverflow { length } => {
                write!(f, "length overflow: {length}")
            }
            Self::Compression(err) => write!(f, "manifest compression failed: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ManifestBody(e) => Some(e),
            Self::Framing(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compression(e) => Some(e),
            Self::LengthOverflow { .. } => None,
        }
    }
}

impl From<ByteError> for DecodeError {
    fn from(err: ByteError) -> Self {
        Self::Framing(err)
    }
}
