//! Dense row-major matrices.

use crate::error::{BufferError, BufferResult};

/// A dense row-major `rows x cols` matrix.
///
/// Vertex buffers store one vertex (or instance, or layer) per row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Floating-point vertex buffer.
pub type FloatMatrix = Matrix<f32>;

/// Quantized integer buffer.
pub type IntMatrix = Matrix<i32>;

impl<T> Matrix<T> {
    /// Creates a matrix from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> BufferResult<Self> {
        let expected = rows.checked_mul(cols).ok_or(BufferError::DataLength {
            expected: usize::MAX,
            actual: data.len(),
        })?;
        if data.len() != expected {
            return Err(BufferError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the element at `(row, col)`, if in bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    /// Returns one row as a slice, if in bounds.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // `chunks_exact(0)` panics, and a zero-width matrix has no meaningful rows.
        let width = self.cols.max(1);
        self.data.chunks_exact(width).take(self.rows)
    }

    pub(crate) fn ensure_shape(&self, rows: usize, cols: usize) -> BufferResult<()> {
        if self.rows != rows || self.cols != cols {
            return Err(BufferError::ShapeMismatch {
                expected: (rows, cols),
                actual: (self.rows, self.cols),
            });
        }
        Ok(())
    }
}

impl<T: Copy + Default> Matrix<T> {
    /// Creates a matrix filled with `T::default()`.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Creates a matrix from fixed-width rows.
    #[must_use]
    pub fn from_rows<const N: usize>(rows: &[[T; N]]) -> Self {
        Self {
            rows: rows.len(),
            cols: N,
            data: rows.iter().flatten().copied().collect(),
        }
    }
}

impl Matrix<f32> {
    /// Per-column minimum. Empty columns report `0.0`.
    #[must_use]
    pub fn column_min(&self) -> Vec<f32> {
        self.column_fold(f32::INFINITY, f32::min)
    }

    /// Per-column maximum. Empty columns report `0.0`.
    #[must_use]
    pub fn column_max(&self) -> Vec<f32> {
        self.column_fold(f32::NEG_INFINITY, f32::max)
    }

    /// Global `max - min` over every element; `0.0` for an empty matrix.
    #[must_use]
    pub fn value_range(&self) -> f32 {
        let (min, max) = self
            .data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            0.0
        } else {
            max - min
        }
    }

    /// Returns the first non-finite element position, if any.
    #[must_use]
    pub fn find_non_finite(&self) -> Option<(usize, usize)> {
        let cols = self.cols.max(1);
        self.data
            .iter()
            .position(|v| !v.is_finite())
            .map(|idx| (idx / cols, idx % cols))
    }

    /// Largest absolute elementwise difference between two same-shape matrices.
    pub fn max_abs_diff(&self, other: &Self) -> BufferResult<f32> {
        other.ensure_shape(self.rows, self.cols)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .fold(0.0f32, |acc, (a, b)| acc.max((a - b).abs())))
    }

    fn column_fold(&self, init: f32, op: fn(f32, f32) -> f32) -> Vec<f32> {
        let mut out = vec![init; self.cols];
        for row in self.iter_rows() {
            for (acc, &v) in out.iter_mut().zip(row) {
                *acc = op(*acc, v);
            }
        }
        if self.rows == 0 {
            out.iter_mut().for_each(|v| *v = 0.0);
        }
        out
    }
}
