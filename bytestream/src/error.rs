//! Error types for bytestream operations.

use std::fmt;

/// Result type for bytestream operations.
pub type ByteResult<T> = Result<T, ByteError>;

/// Errors that can occur during byte-level encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteError {
    /// Attempted to read past the end of the buffer.
    UnexpectedEof {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A varint ran past five bytes or overflowed `u32`.
    InvalidVarint,

    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8,

    /// A length does not fit in the on-wire integer width.
    LengthOverflow {
        /// The length that could not be encoded.
        length: usize,
    },

    /// A decoded length exceeds the caller-supplied bound.
    LengthLimit {
        /// The decoded length.
        length: usize,
        /// Maximum allowed length.
        max: usize,
    },
}

impl fmt::Display for ByteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                requested,
                available,
            } => {
                write!(
                    f,
                    "attempted to read {requested} bytes but only {available} bytes available"
                )
            }
            Self::InvalidVarint => write!(f, "invalid varint encoding"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::LengthOverflow { length } => {
                write!(f, "length {length} does not fit in a u32")
            }
            Self::LengthLimit { length, max } => {
                write!(f, "length {length} exceeds maximum {max}")
            }
        }
    }
}

impl std::error::Error for ByteError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unexpected_eof() {
        let err = ByteError::UnexpectedEof {
            requested: 8,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("8 bytes"), "should mention requested bytes");
        assert!(msg.contains("3 bytes"), "should mention available bytes");
    }

    #[test]
    fn error_display_length_limit() {
        let err = ByteError::LengthLimit {
            length: 300,
            max: 255,
        };
        let msg = err.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("255"));
    }

    #[test]
    fn error_equality() {
        let err1 = ByteError::UnexpectedEof {
            requested: 8,
            available: 3,
        };
        let err2 = ByteError::UnexpectedEof {
            requested: 8,
            available: 3,
        };
        assert_eq!(err1, err2);
        assert_ne!(err1, ByteError::InvalidVarint);
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<ByteError>();
    }
}
