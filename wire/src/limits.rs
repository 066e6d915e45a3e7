//! Configurable limits for bounded decoding.

/// Container-level limits for decoding.
///
/// These limits are enforced before any length read from the container is
/// used to allocate, so a hostile manifest cannot request unbounded memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum container size in bytes.
    pub max_container_bytes: usize,

    /// Maximum number of entity blocks.
    pub max_blocks: usize,

    /// Maximum uncompressed length of a single block in bytes.
    pub max_block_bytes: usize,

    /// Maximum length of a block name in bytes.
    pub max_name_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_container_bytes: 1024 * 1024 * 1024,
            max_blocks: 65_536,
            max_block_bytes: 256 * 1024 * 1024,
            max_name_len: 255,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_container_bytes: 1024 * 1024,
            max_blocks: 64,
            max_block_bytes: 64 * 1024,
            max_name_len: 64,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_container_bytes: usize::MAX,
            max_blocks: usize::MAX,
            max_block_bytes: usize::MAX,
            max_name_len: usize::MAX,
        }
    }
}
