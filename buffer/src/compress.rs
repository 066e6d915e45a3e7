//! Lossless deflate/inflate of raw byte buffers.
//!
//! Streams use zlib framing, so the Adler-32 trailer catches corrupted bytes
//! that would otherwise inflate to plausible-looking data. The format does
//! not record the uncompressed length; callers keep it alongside the bytes.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{BufferError, BufferResult, CorruptReason};

/// Compresses `bytes`. Empty input yields a short stream that inflates to empty.
pub fn deflate(bytes: &[u8]) -> BufferResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(bytes.len() / 2 + 16),
        Compression::default(),
    );
    encoder
        .write_all(bytes)
        .map_err(|err| BufferError::Compression {
            message: err.to_string(),
        })?;
    encoder.finish().map_err(|err| BufferError::Compression {
        message: err.to_string(),
    })
}

/// Reverses [`deflate`], requiring the output to be exactly `expected_len` bytes.
pub fn inflate(bytes: &[u8], expected_len: usize) -> BufferResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::with_capacity(expected_len);
    // Read one byte past the declared length so oversized streams are detected
    // without inflating them fully.
    let limit = u64::try_from(expected_len)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    (&mut decoder)
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|err| {
            BufferError::Corrupt(CorruptReason::InvalidStream {
                message: err.to_string(),
            })
        })?;

    if out.len() != expected_len {
        return Err(BufferError::Corrupt(CorruptReason::LengthMismatch {
            expected: expected_len,
            actual: out.len(),
        }));
    }

    let consumed = usize::try_from(decoder.total_in()).unwrap_or(usize::MAX);
    if consumed != bytes.len() {
        return Err(BufferError::Corrupt(CorruptReason::TrailingBytes {
            consumed,
            total: bytes.len(),
        }));
    }

    Ok(out)
}
