//! Fixed-point quantization of floating-point buffers.
//!
//! A value `v` in column `c` maps to `round((v - origin[c]) / step)`, and back
//! to `q * step + origin[c]`. Intermediate math runs in `f64`, so the
//! reconstruction error is bounded by `step / 2` plus the final `f32` rounding.

use crate::error::{BufferError, BufferResult};
use crate::matrix::{FloatMatrix, IntMatrix, Matrix};

/// Integer buffer plus the per-column origin it is relative to.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantized {
    pub values: IntMatrix,
    pub origin: Vec<f32>,
}

/// Quantizes `matrix` against its own per-column minimum.
pub fn quantize(matrix: &FloatMatrix, step: f32) -> BufferResult<Quantized> {
    if let Some((row, col)) = matrix.find_non_finite() {
        return Err(BufferError::NonFiniteValue { row, col });
    }
    let origin = matrix.column_min();
    let values = quantize_with_origin(matrix, step, &origin)?;
    Ok(Quantized { values, origin })
}

/// Quantizes `matrix` against a caller-supplied per-column origin.
///
/// Values below the origin produce negative integers.
pub fn quantize_with_origin(
    matrix: &FloatMatrix,
    step: f32,
    origin: &[f32],
) -> BufferResult<IntMatrix> {
    validate_step(step)?;
    validate_origin(origin, matrix.cols())?;

    let cols = matrix.cols().max(1);
    let step = f64::from(step);
    let mut data = Vec::with_capacity(matrix.len());
    for (idx, &value) in matrix.as_slice().iter().enumerate() {
        let (row, col) = (idx / cols, idx % cols);
        if !value.is_finite() {
            return Err(BufferError::NonFiniteValue { row, col });
        }
        let q = ((f64::from(value) - f64::from(origin[col])) / step).round();
        if q < f64::from(i32::MIN) || q > f64::from(i32::MAX) {
            return Err(BufferError::QuantizedOutOfRange { row, col });
        }
        data.push(q as i32);
    }
    Matrix::new(matrix.rows(), matrix.cols(), data)
}

/// Maps integers back to floating point: `q * step + origin[col]`.
pub fn dequantize(values: &IntMatrix, step: f32, origin: &[f32]) -> BufferResult<FloatMatrix> {
    validate_step(step)?;
    validate_origin(origin, values.cols())?;

    let cols = values.cols().max(1);
    let step = f64::from(step);
    let data = values
        .as_slice()
        .iter()
        .enumerate()
        .map(|(idx, &q)| (f64::from(q) * step + f64::from(origin[idx % cols])) as f32)
        .collect();
    Matrix::new(values.rows(), values.cols(), data)
}

/// Largest elementwise error introduced by quantizing `matrix` at `step`.
pub fn reconstruction_error(matrix: &FloatMatrix, step: f32, origin: &[f32]) -> BufferResult<f32> {
    let values = quantize_with_origin(matrix, step, origin)?;
    let restored = dequantize(&values, step, origin)?;
    matrix.max_abs_diff(&restored)
}

/// Checks that `step` is usable as a quantization step.
pub fn validate_step(step: f32) -> BufferResult<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(BufferError::InvalidStep { step })
    }
}

fn validate_origin(origin: &[f32], cols: usize) -> BufferResult<()> {
    if origin.len() != cols {
        return Err(BufferError::OriginLength {
            expected: cols,
            actual: origin.len(),
        });
    }
    if let Some(col) = origin.iter().position(|v| !v.is_finite()) {
        return Err(BufferError::NonFiniteOrigin { col });
    }
    Ok(())
}
