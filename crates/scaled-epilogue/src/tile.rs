//! Accumulator and output tiles.

use crate::error::{EpilogueError, Result};
use crate::types::Element;

/// Raw GEMM accumulator values for one output tile, row-major.
///
/// The origin places the tile inside the full `M x N` output so that
/// per-row and per-column operands sized for the whole problem are indexed
/// by global coordinate.
#[derive(Debug, Clone, Copy)]
pub struct AccumulatorTile<'a, A: Element> {
    data: &'a [A],
    rows: usize,
    cols: usize,
    row_offset: usize,
    col_offset: usize,
}

impl<'a, A: Element> AccumulatorTile<'a, A> {
    /// Wrap row-major accumulator data covering the whole output.
    pub fn new(data: &'a [A], rows: usize, cols: usize) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            EpilogueError::ShapeMismatch(format!(
                "accumulator: {}x{} overflows the address space",
                rows, cols
            ))
        })?;
        if data.len() != len {
            return Err(EpilogueError::ShapeMismatch(format!(
                "accumulator: expected {} elements for {}x{}, got {}",
                len,
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self {
            data,
            rows,
            cols,
            row_offset: 0,
            col_offset: 0,
        })
    }

    /// Place the tile at `(row_offset, col_offset)` of the full output.
    pub fn at(mut self, row_offset: usize, col_offset: usize) -> Self {
        self.row_offset = row_offset;
        self.col_offset = col_offset;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    pub fn as_slice(&self) -> &'a [A] {
        self.data
    }

    /// Accumulator value at tile-local `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> A {
        self.data[row * self.cols + col]
    }
}

/// Final epilogue output, row-major, same shape as the accumulator tile.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTile<D: Element> {
    data: Vec<D>,
    rows: usize,
    cols: usize,
}

impl<D: Element> OutputTile<D> {
    pub(crate) fn from_vec(data: Vec<D>, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { data, rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[D] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<D> {
        self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> D {
        self.data[row * self.cols + col]
    }

    /// Widen every element to `f32`, row-major.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.data.iter().map(|v| v.to_f32()).collect()
    }
}

/// Block size used to split one launch into independently evaluated sub-tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileShape {
    pub rows: usize,
    pub cols: usize,
}

impl TileShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of sub-tiles along each axis for an `m x n` output.
    pub fn grid(&self, m: usize, n: usize) -> (usize, usize) {
        (m.div_ceil(self.rows), n.div_ceil(self.cols))
    }
}

impl Default for TileShape {
    fn default() -> Self {
        Self { rows: 64, cols: 64 }
    }
}
