//! Runtime-selected epilogue: the argument builder used per launch.

use crate::config::EpilogueConfig;
use crate::core::{ArgumentBlock, EpilogueOperands, EpilogueTree, OperandRole};
use crate::error::{EpilogueError, Result};
use crate::evaluate::evaluate_tree;
use crate::tile::{AccumulatorTile, OutputTile, TileShape};
use crate::types::Element;
use crate::variants::{
    Epilogue, EpilogueVariant, ScaledEpilogue, ScaledEpilogueBias, ScaledEpilogueBiasLs,
    ScaledEpilogueLs,
};
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Composition {
    Scaled(ScaledEpilogue),
    ScaledBias(ScaledEpilogueBias),
    ScaledLs(ScaledEpilogueLs),
    ScaledBiasLs(ScaledEpilogueBiasLs),
}

/// One of the four fixed epilogues, chosen at runtime by [`EpilogueVariant`].
///
/// The expression tree is composed once in [`ScaledMmEpilogue::new`];
/// [`build_arguments`](ScaledMmEpilogue::build_arguments) then only binds
/// operand slices.
///
/// # Example
///
/// ```
/// use scaled_epilogue::{
///     AccumulatorTile, EpilogueConfig, EpilogueOperands, EpilogueVariant, ScaledMmEpilogue,
/// };
///
/// let epi = ScaledMmEpilogue::new(EpilogueVariant::ScaledBias, &EpilogueConfig::new()).unwrap();
/// let acc = [1.0f32, 2.0, 3.0, 4.0];
/// let tile = AccumulatorTile::new(&acc, 2, 2).unwrap();
/// let (a, b, bias) = ([2.0f32, 3.0], [10.0f32, 100.0], [1.0f32, 1.0]);
///
/// let ops = EpilogueOperands::new(&a[..], &b[..]).with_bias(&bias[..]);
/// let args = epi.build_arguments(&tile, ops).unwrap();
/// let out = epi.evaluate::<f32, f32>(&args, &tile).unwrap();
/// assert_eq!(out.as_slice(), &[21.0, 401.0, 91.0, 1201.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledMmEpilogue {
    composition: Composition,
    tile: TileShape,
}

impl ScaledMmEpilogue {
    #[instrument(level = "debug", skip(config), fields(
        accumulator = %config.accumulator_type(),
        output = %config.output_type(),
    ), err)]
    pub fn new(variant: EpilogueVariant, config: &EpilogueConfig) -> Result<Self> {
        config.validate()?;
        let (acc, out) = (config.accumulator_type(), config.output_type());
        let composition = match variant {
            EpilogueVariant::Scaled => Composition::Scaled(ScaledEpilogue::new(acc, out)?),
            EpilogueVariant::ScaledBias => {
                Composition::ScaledBias(ScaledEpilogueBias::new(acc, out)?)
            }
            EpilogueVariant::ScaledLs => Composition::ScaledLs(ScaledEpilogueLs::new(acc, out)?),
            EpilogueVariant::ScaledBiasLs => {
                Composition::ScaledBiasLs(ScaledEpilogueBiasLs::new(acc, out)?)
            }
        };
        Ok(Self {
            composition,
            tile: config.tile_shape(),
        })
    }

    pub fn variant(&self) -> EpilogueVariant {
        match &self.composition {
            Composition::Scaled(_) => EpilogueVariant::Scaled,
            Composition::ScaledBias(_) => EpilogueVariant::ScaledBias,
            Composition::ScaledLs(_) => EpilogueVariant::ScaledLs,
            Composition::ScaledBiasLs(_) => EpilogueVariant::ScaledBiasLs,
        }
    }

    pub fn tree(&self) -> &EpilogueTree {
        match &self.composition {
            Composition::Scaled(e) => e.tree(),
            Composition::ScaledBias(e) => e.tree(),
            Composition::ScaledLs(e) => e.tree(),
            Composition::ScaledBiasLs(e) => e.tree(),
        }
    }

    pub fn tile_shape(&self) -> TileShape {
        self.tile
    }

    /// Build the argument block for one launch over `acc`.
    ///
    /// Operands are checked against the variant: a required operand that is
    /// absent or empty is [`EpilogueError::MissingOperand`], an optional
    /// operand the variant does not read is
    /// [`EpilogueError::UnexpectedOperand`]. Vector operands must cover the
    /// tile at its origin.
    #[instrument(level = "debug", skip_all, fields(
        variant = %self.variant(),
        rows = acc.rows(),
        cols = acc.cols(),
    ), err)]
    pub fn build_arguments<'a, A: Element>(
        &self,
        acc: &AccumulatorTile<'_, A>,
        operands: EpilogueOperands<'a>,
    ) -> Result<ArgumentBlock<'a>> {
        let variant = self.variant();
        if !variant.uses_bias() {
            reject_unused(&operands, OperandRole::Bias, variant)?;
        }
        if !variant.uses_multiplier() {
            reject_unused(&operands, OperandRole::Multiplier, variant)?;
        }

        let args = match &self.composition {
            Composition::Scaled(e) => e.prepare_operands(&operands)?,
            Composition::ScaledBias(e) => e.prepare_operands(&operands)?,
            Composition::ScaledLs(e) => e.prepare_operands(&operands)?,
            Composition::ScaledBiasLs(e) => e.prepare_operands(&operands)?,
        };
        args.check_extent(acc.row_offset(), acc.col_offset(), acc.rows(), acc.cols())?;
        debug!(loads = args.loads().len(), "built argument block");
        Ok(args)
    }

    /// Evaluate an argument block built by this epilogue.
    pub fn evaluate<A: Element, D: Element>(
        &self,
        args: &ArgumentBlock<'_>,
        acc: &AccumulatorTile<'_, A>,
    ) -> Result<OutputTile<D>> {
        if let Some(built_for) = args.variant() {
            if built_for != self.variant() {
                return Err(EpilogueError::ArgumentShape(format!(
                    "arguments built for {} passed to {}",
                    built_for,
                    self.variant()
                )));
            }
        }
        evaluate_tree(self.tree(), args, acc, self.tile)
    }
}

fn reject_unused(
    operands: &EpilogueOperands<'_>,
    role: OperandRole,
    variant: EpilogueVariant,
) -> Result<()> {
    match operands.get(role) {
        Some(_) => Err(EpilogueError::UnexpectedOperand(role.name(), variant.name())),
        None => Ok(()),
    }
}
