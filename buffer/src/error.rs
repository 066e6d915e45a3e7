//! Error types for buffer operations.

use std::fmt;

/// Result type for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur while building, compressing, or quantizing buffers.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferError {
    /// Element count does not match `rows * cols`.
    DataLength { expected: usize, actual: usize },

    /// Two matrices (or a matrix and a channel) disagree on shape.
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Per-column origin has the wrong number of entries.
    OriginLength { expected: usize, actual: usize },

    /// Quantization step is zero, negative, or not finite.
    InvalidStep { step: f32 },

    /// A buffer element is NaN or infinite.
    NonFiniteValue { row: usize, col: usize },

    /// A quantization origin entry is NaN or infinite.
    NonFiniteOrigin { col: usize },

    /// A quantized value does not fit in `i32`.
    QuantizedOutOfRange { row: usize, col: usize },

    /// Compressed data could not be reconstructed.
    Corrupt(CorruptReason),

    /// The compressor failed to produce output.
    Compression { message: String },
}

/// Details for corrupt compressed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorruptReason {
    /// The zlib stream is malformed or its checksum does not match.
    InvalidStream { message: String },
    /// The stream inflated to a different length than declared.
    LengthMismatch { expected: usize, actual: usize },
    /// Bytes remain after the end of the zlib stream.
    TrailingBytes { consumed: usize, total: usize },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataLength { expected, actual } => {
                write!(f, "matrix data has {actual} elements, expected {expected}")
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(
                    f,
                    "shape mismatch: expected {}x{}, found {}x{}",
                    expected.0, expected.1, actual.0, actual.1
                )
            }
            Self::OriginLength { expected, actual } => {
                write!(f, "origin has {actual} columns, expected {expected}")
            }
            Self::InvalidStep { step } => {
                write!(f, "quantization step must be finite and positive, got {step}")
            }
            Self::NonFiniteValue { row, col } => {
                write!(f, "non-finite value at ({row}, {col})")
            }
            Self::NonFiniteOrigin { col } => {
                write!(f, "non-finite quantization origin in column {col}")
            }
            Self::QuantizedOutOfRange { row, col } => {
                write!(f, "quantized value at ({row}, {col}) does not fit in i32")
            }
            Self::Corrupt(reason) => write!(f, "corrupt compressed data: {reason}"),
            Self::Compression { message } => write!(f, "compression failed: {message}"),
        }
    }
}

impl fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStream { message } => write!(f, "invalid zlib stream ({message})"),
            Self::LengthMismatch { expected, actual } => {
                write!(f, "inflated to {actual} bytes, expected {expected}")
            }
            Self::TrailingBytes { consumed, total } => {
                write!(f, "stream ended after {consumed} of {total} bytes")
            }
        }
    }
}

impl std::error::Error for BufferError {}
