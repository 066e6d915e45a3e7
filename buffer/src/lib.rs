//! Buffers and the buffer codec for scenepack.
//!
//! This crate defines how animated scene state is held in memory and how it is
//! shrunk before it is written:
//! - Dense row-major [`Matrix`] buffers and the [`Channel`]s they fill
//! - [`EntityKind`] rules for which channels an entity may carry
//! - Lossless [`deflate`]/[`inflate`] of raw bytes
//! - Fixed-point [`quantize`]/[`dequantize`] of floating-point matrices
//! - Content [`digest`]s for integrity checks
//!
//! # Design Principles
//!
//! - **Explicit shapes** - Every buffer carries its own row and column counts.
//! - **Bounded error** - Quantization never moves a value by more than half a step.
//! - **Self-checking** - Corrupt compressed data is an error, never silent garbage.

mod channel;
mod compress;
mod error;
mod hash;
mod matrix;
mod quantize;

pub use channel::{Channel, EntityKind};
pub use compress::{deflate, inflate};
pub use error::{BufferError, BufferResult, CorruptReason};
pub use hash::digest;
pub use matrix::{FloatMatrix, IntMatrix, Matrix};
pub use quantize::{
    dequantize, quantize, quantize_with_origin, reconstruction_error, validate_step, Quantized,
};
