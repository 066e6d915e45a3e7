//! Core types for the codec.

use std::fmt;

use crate::error::{CodecError, CodecResult, EntityIdReason};

/// Maximum entity id length in bytes.
pub const MAX_ENTITY_ID_LEN: usize = 255;

/// A stable entity identifier.
///
/// Entity ids name a scene object for its whole lifetime and double as the
/// container block name, so they are validated once on construction: non-empty,
/// at most [`MAX_ENTITY_ID_LEN`] bytes, and free of control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a validated entity id.
    pub fn new(id: impl Into<String>) -> CodecResult<Self> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some(EntityIdReason::Empty)
        } else if id.len() > MAX_ENTITY_ID_LEN {
            Some(EntityIdReason::TooLong {
                len: id.len(),
                max: MAX_ENTITY_ID_LEN,
            })
        } else if id.chars().any(char::is_control) {
            Some(EntityIdReason::ControlCharacter)
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CodecError::InvalidEntityId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for EntityId {
    type Error = CodecError;

    fn try_from(id: &str) -> CodecResult<Self> {
        Self::new(id)
    }
}

/// Whether a command is a full snapshot or an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    Create = 1,
    Update = 2,
}

impl CommandKind {
    /// Parses a command kind from its raw byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Create),
            2 => Some(Self::Update),
            _ => None,
        }
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}
