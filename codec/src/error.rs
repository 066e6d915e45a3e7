//! Error types for codec operations.

use std::fmt;

use buffer::{BufferError, Channel, EntityKind};
use bytestream::ByteError;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Broad classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed a malformed value (bad entity id, bad step, wrong shape).
    InvalidArgument,
    /// A history invariant would be violated.
    InvalidState,
    /// Container or compressed data failed to decode or verify.
    CorruptData,
}

/// Errors that can occur while recording, quantizing, or (de)serializing commands.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Entity id is empty, too long, or contains control characters.
    InvalidEntityId { id: String, reason: EntityIdReason },

    /// Channel is not carried by this entity kind.
    ChannelNotAllowed {
        channel: Channel,
        entity_kind: EntityKind,
    },

    /// Channel buffer has the wrong column count.
    ChannelWidth {
        channel: Channel,
        expected: usize,
        actual: usize,
    },

    /// Channels within one command disagree on row count.
    RowCountMismatch {
        channel: Channel,
        expected: usize,
        actual: usize,
    },

    /// Quantized data passed to a public constructor.
    QuantizedInput { channel: Channel },

    /// A creation command carries a delta.
    DeltaInCreate { channel: Channel },

    /// Tolerance is missing, non-finite, or not positive.
    InvalidTolerance { reason: ToleranceReason },

    /// Matrix, quantization, or compression error.
    Buffer(BufferError),

    /// A container could not be framed for writing.
    Encode(wire::EncodeError),

    /// First command of a history is not a creation.
    UpdateBeforeCreate { entity_id: String },

    /// A creation command appears after the first command.
    DuplicateCreate { entity_id: String, index: usize },

    /// A command belongs to a different entity than the history.
    EntityMismatch { expected: String, found: String },

    /// A command's entity kind differs from the history's.
    EntityKindMismatch {
        entity_id: String,
        expected: EntityKind,
        found: EntityKind,
    },

    /// A channel changed row count within one history.
    ShapeChanged {
        entity_id: String,
        channel: Channel,
        expected: usize,
        actual: usize,
    },

    /// A delta has no quantized base with a matching step.
    DeltaWithoutBase { entity_id: String, channel: Channel },

    /// A history must hold at least one command.
    EmptyHistory,

    /// No history exists for this entity.
    UnknownEntity { entity_id: String },

    /// Container framing error.
    Wire(wire::DecodeError),

    /// Command payload framing error.
    Bytes(ByteError),

    /// Unknown command kind byte.
    UnknownCommandKind { raw: u8 },

    /// Unknown entity kind byte.
    UnknownEntityKind { raw: u8 },

    /// Unknown channel encoding tag.
    UnknownChannelEncoding { tag: u8 },

    /// Channel mask has reserved bits set.
    InvalidChannelMask { mask: u8 },

    /// A decoded buffer declares more elements than its payload holds.
    ChannelTooLarge { channel: Channel, rows: usize },

    /// Bytes remain after a payload or block body.
    TrailingBytes { consumed: usize, total: usize },

    /// Block body does not match its manifest digest.
    DigestMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// Two blocks carry the same entity id.
    DuplicateEntity { entity_id: String },

    /// Accumulated quantized deltas left the `i32` range.
    QuantizedOverflow { entity_id: String, channel: Channel },

    /// A block decoded but its contents are invalid.
    InvalidBlock {
        name: String,
        reason: Box<CodecError>,
    },
}

/// Reasons an entity id is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityIdReason {
    Empty,
    TooLong { len: usize, max: usize },
    ControlCharacter,
}

/// Reasons a tolerance is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToleranceReason {
    Missing,
    Relative(f32),
    Absolute(f32),
}

impl CodecError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEntityId { .. }
            | Self::ChannelNotAllowed { .. }
            | Self::ChannelWidth { .. }
            | Self::RowCountMismatch { .. }
            | Self::QuantizedInput { .. }
            | Self::DeltaInCreate { .. }
            | Self::InvalidTolerance { .. }
            | Self::Encode(_) => ErrorKind::InvalidArgument,
            Self::Buffer(BufferError::Corrupt(_)) => ErrorKind::CorruptData,
            Self::Buffer(BufferError::Compression { .. }) => ErrorKind::InvalidState,
            Self::Buffer(_) => ErrorKind::InvalidArgument,
            Self::UpdateBeforeCreate { .. }
            | Self::DuplicateCreate { .. }
            | Self::EntityMismatch { .. }
            | Self::EntityKindMismatch { .. }
            | Self::ShapeChanged { .. }
            | Self::DeltaWithoutBase { .. }
            | Self::EmptyHistory
            | Self::UnknownEntity { .. } => ErrorKind::InvalidState,
            Self::Wire(_)
            | Self::Bytes(_)
            | Self::UnknownCommandKind { .. }
            | Self::UnknownEntityKind { .. }
            | Self::UnknownChannelEncoding { .. }
            | Self::InvalidChannelMask { .. }
            | Self::ChannelTooLarge { .. }
            | Self::TrailingBytes { .. }
            | Self::DigestMismatch { .. }
            | Self::DuplicateEntity { .. }
            | Self::QuantizedOverflow { .. }
            | Self::InvalidBlock { .. } => ErrorKind::CorruptData,
        }
    }

    pub(crate) fn in_block(self, name: &str) -> Self {
        match self {
            Self::InvalidBlock { .. } | Self::DigestMismatch { .. } => self,
            other => Self::InvalidBlock {
                name: name.to_string(),
                reason: Box::new(other),
            },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidState => "invalid state",
            Self::CorruptData => "corrupt data",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEntityId { id, reason } => {
                write!(f, "invalid entity id {id:?}: {reason}")
            }
            Self::ChannelNotAllowed {
                channel,
                entity_kind,
            } => {
                write!(
                    f,
                    "{} entities do not carry {} buffers",
                    entity_kind.name(),
                    channel.name()
                )
            }
            Self::ChannelWidth {
                channel,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} buffer has {actual} columns, expected {expected}",
                    channel.name()
                )
            }
            Self::RowCountMismatch {
                channel,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} buffer has {actual} rows, other channels have {expected}",
                    channel.name()
                )
            }
            Self::QuantizedInput { channel } => {
                write!(
                    f,
                    "{} buffer is quantized; only quantization may produce quantized commands",
                    channel.name()
                )
            }
            Self::DeltaInCreate { channel } => {
                write!(f, "creation command carries a {} delta", channel.name())
            }
            Self::InvalidTolerance { reason } => write!(f, "invalid tolerance: {reason}"),
            Self::Buffer(err) => write!(f, "buffer error: {err}"),
            Self::Encode(err) => write!(f, "container encode error: {err}"),
            Self::UpdateBeforeCreate { entity_id } => {
                write!(f, "first command for {entity_id:?} is an update, not a creation")
            }
            Self::DuplicateCreate { entity_id, index } => {
                write!(f, "command {index} for {entity_id:?} is a second creation")
            }
            Self::EntityMismatch { expected, found } => {
                write!(f, "command for {found:?} pushed to history of {expected:?}")
            }
            Self::EntityKindMismatch {
                entity_id,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{entity_id:?} is a {} but command is for a {}",
                    expected.name(),
                    found.name()
                )
            }
            Self::ShapeChanged {
                entity_id,
                channel,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{entity_id:?} {} changed from {expected} to {actual} rows",
                    channel.name()
                )
            }
            Self::DeltaWithoutBase { entity_id, channel } => {
                write!(
                    f,
                    "{entity_id:?} {} delta has no quantized base with the same step",
                    channel.name()
                )
            }
            Self::EmptyHistory => write!(f, "history has no commands"),
            Self::UnknownEntity { entity_id } => write!(f, "no history for {entity_id:?}"),
            Self::Wire(err) => write!(f, "wire error: {err}"),
            Self::Bytes(err) => write!(f, "payload error: {err}"),
            Self::UnknownCommandKind { raw } => write!(f, "unknown command kind {raw}"),
            Self::UnknownEntityKind { raw } => write!(f, "unknown entity kind {raw}"),
            Self::UnknownChannelEncoding { tag } => {
                write!(f, "unknown channel encoding {tag}")
            }
            Self::InvalidChannelMask { mask } => {
                write!(f, "channel mask 0x{mask:02X} has reserved bits set")
            }
            Self::ChannelTooLarge { channel, rows } => {
                write!(
                    f,
                    "{} buffer declares {rows} rows, more than its payload holds",
                    channel.name()
                )
            }
            Self::TrailingBytes { consumed, total } => {
                write!(f, "decoded {consumed} of {total} bytes")
            }
            Self::DigestMismatch {
                name,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "block {name:?} digest 0x{actual:016X} does not match manifest 0x{expected:016X}"
                )
            }
            Self::DuplicateEntity { entity_id } => {
                write!(f, "entity {entity_id:?} appears in more than one block")
            }
            Self::QuantizedOverflow { entity_id, channel } => {
                write!(
                    f,
                    "{entity_id:?} {} deltas overflow the quantized range",
                    channel.name()
                )
            }
            Self::InvalidBlock { name, reason } => write!(f, "block {name:?}: {reason}"),
        }
    }
}

impl fmt::Display for EntityIdReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::TooLong { len, max } => write!(f, "{len} bytes, max {max}"),
            Self::ControlCharacter => write!(f, "contains a control character"),
        }
    }
}

impl fmt::Display for ToleranceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "neither relative nor absolute tolerance given"),
            Self::Relative(value) => {
                write!(f, "relative tolerance {value} must be finite and positive")
            }
            Self::Absolute(value) => {
                write!(f, "absolute tolerance {value} must be finite and positive")
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Buffer(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::Bytes(e) => Some(e),
            Self::InvalidBlock { reason, .. } => Some(reason.as_ref()),
            _ => None,
        }
    }
}

impl From<BufferError> for CodecError {
    fn from(err: BufferError) -> Self {
        Self::Buffer(err)
    }
}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<wire::EncodeError> for CodecError {
    fn from(err: wire::EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<ByteError> for CodecError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer::CorruptReason;

    #[test]
    fn error_display_update_before_create() {
        let err = CodecError::UpdateBeforeCreate {
            entity_id: "jelly_base".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("jelly_base"));
        assert!(msg.contains("creation"));
    }

    #[test]
    fn buffer_errors_classified() {
        let corrupt = CodecError::from(BufferError::Corrupt(CorruptReason::LengthMismatch {
            expected: 4,
            actual: 2,
        }));
        assert_eq!(corrupt.kind(), ErrorKind::CorruptData);

        let step = CodecError::from(BufferError::InvalidStep { step: 0.0 });
        assert_eq!(step.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn wire_errors_are_corrupt() {
        let err = CodecError::from(wire::DecodeError::InvalidMagic { found: 0 });
        assert_eq!(err.kind(), ErrorKind::CorruptData);
        let err = CodecError::from(ByteError::InvalidVarint);
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn history_errors_are_invalid_state() {
        let err = CodecError::ShapeChanged {
            entity_id: "a".to_string(),
            channel: Channel::Positions,
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(CodecError::EmptyHistory.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn in_block_wraps_once() {
        let err = CodecError::UpdateBeforeCreate {
            entity_id: "a".to_string(),
        }
        .in_block("a")
        .in_block("a");
        assert_eq!(err.kind(), ErrorKind::CorruptData);
        match &err {
            CodecError::InvalidBlock { reason, .. } => {
                assert!(matches!(**reason, CodecError::UpdateBeforeCreate { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::CorruptData.to_string(), "corrupt data");
    }
}
