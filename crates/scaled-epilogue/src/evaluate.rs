//! Evaluation of an expression tree over an accumulator tile.
//!
//! The output is split into bands of `TileShape::rows` rows; with the
//! `parallel` feature the bands run concurrently on the rayon pool. Every
//! output element is written by exactly one band and operands are only read,
//! so the result does not depend on scheduling.

use crate::core::{ArgumentBlock, EpilogueTree, NodeArgs};
use crate::error::{EpilogueError, Result};
use crate::tile::{AccumulatorTile, OutputTile, TileShape};
use crate::types::{Element, RoundStyle};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Evaluate `tree` with `args` once per element of `acc`.
///
/// Validates element types, the argument shape and operand extents before
/// touching any element.
#[instrument(
    level = "debug",
    skip_all,
    fields(rows = acc.rows(), cols = acc.cols(), variant = ?args.variant())
)]
pub fn evaluate_tree<A: Element, D: Element>(
    tree: &EpilogueTree,
    args: &ArgumentBlock<'_>,
    acc: &AccumulatorTile<'_, A>,
    tile: TileShape,
) -> Result<OutputTile<D>> {
    if A::TYPE != tree.accumulator_type() {
        return Err(EpilogueError::ElementTypeMismatch {
            operand: "accumulator",
            expected: tree.accumulator_type(),
            actual: A::TYPE,
        });
    }
    if D::TYPE != tree.output_type() {
        return Err(EpilogueError::ElementTypeMismatch {
            operand: "output",
            expected: tree.output_type(),
            actual: D::TYPE,
        });
    }
    if tile.rows == 0 || tile.cols == 0 {
        return Err(EpilogueError::InvalidConfiguration(format!(
            "tile shape must be non-empty, got {}x{}",
            tile.rows, tile.cols
        )));
    }
    tree.check_args(args)?;
    args.check_extent(acc.row_offset(), acc.col_offset(), acc.rows(), acc.cols())?;

    let (rows, cols) = (acc.rows(), acc.cols());
    let mut out = vec![D::default(); rows * cols];
    if out.is_empty() {
        return Ok(OutputTile::from_vec(out, rows, cols));
    }

    // Bands never exceed the tile, so the band length fits in `rows * cols`.
    let band_rows = tile.rows.min(rows);
    let band = Band {
        tree,
        args: args.root(),
        round: tree.output_round(),
        block_cols: tile.cols,
    };
    let band_len = band_rows * cols;

    #[cfg(feature = "parallel")]
    out.par_chunks_mut(band_len)
        .enumerate()
        .for_each(|(i, chunk)| band.run(acc, i * band_rows, chunk));

    #[cfg(not(feature = "parallel"))]
    out.chunks_mut(band_len)
        .enumerate()
        .for_each(|(i, chunk)| band.run(acc, i * band_rows, chunk));

    let (grid_m, grid_n) = tile.grid(rows, cols);
    debug!(grid_m, grid_n, "evaluated epilogue");
    Ok(OutputTile::from_vec(out, rows, cols))
}

/// Everything a band of rows needs, shared read-only across workers.
struct Band<'t, 'a> {
    tree: &'t EpilogueTree,
    args: &'t NodeArgs<'a>,
    round: RoundStyle,
    block_cols: usize,
}

impl Band<'_, '_> {
    /// Fill `chunk`, which holds output rows starting at tile-local `row0`.
    fn run<A: Element, D: Element>(
        &self,
        acc: &AccumulatorTile<'_, A>,
        row0: usize,
        chunk: &mut [D],
    ) {
        let cols = acc.cols();
        for c0 in (0..cols).step_by(self.block_cols) {
            let c1 = c0.saturating_add(self.block_cols).min(cols);
            for (r, out_row) in chunk.chunks_mut(cols).enumerate() {
                let row = row0 + r;
                let global_row = acc.row_offset() + row;
                for (c, slot) in out_row[c0..c1].iter_mut().enumerate() {
                    let col = c0 + c;
                    let value = self.tree.evaluate_at(
                        self.args,
                        acc.get(row, col).to_f32(),
                        global_row,
                        acc.col_offset() + col,
                    );
                    *slot = D::from_f32_rounded(value, self.round);
                }
            }
        }
    }
}
