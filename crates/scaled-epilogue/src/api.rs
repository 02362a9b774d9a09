use crate::cache::cached_epilogue;
use crate::config::EpilogueConfig;
use crate::core::{ArgumentBlock, EpilogueOperands};
use crate::error::{EpilogueError, Result};
use crate::operand::{Operand, OperandElement};
use crate::tile::{AccumulatorTile, OutputTile};
use crate::types::Element;
use crate::variants::EpilogueVariant;

fn config_for<A: Element, D: Element>() -> EpilogueConfig {
    EpilogueConfig::new().accumulator(A::TYPE).output(D::TYPE)
}

/// Build the argument block for one launch of `variant` over `acc`.
///
/// `D` is the output element type; bias and multiplier operands must have
/// the same type. Which of `bias` and `multiplier` must be `Some` is fixed by
/// the variant; supplying one the variant does not read is an error.
///
/// # Example
///
/// ```
/// use scaled_epilogue::{build_arguments, AccumulatorTile, EpilogueVariant, Operand};
///
/// let acc = [1.0f32, 2.0, 3.0, 4.0];
/// let tile = AccumulatorTile::new(&acc, 2, 2).unwrap();
/// let (a, b) = ([2.0f32], [10.0f32, 100.0]);
///
/// let args = build_arguments::<f32, _>(
///     EpilogueVariant::Scaled,
///     &tile,
///     Operand::F32(&a),
///     Operand::F32(&b),
///     None,
///     None,
/// )
/// .unwrap();
/// assert_eq!(args.loads().len(), 2);
/// ```
pub fn build_arguments<'a, D: Element, A: Element>(
    variant: EpilogueVariant,
    acc: &AccumulatorTile<'_, A>,
    scale_a: Operand<'a>,
    scale_b: Operand<'a>,
    bias: Option<Operand<'a>>,
    multiplier: Option<Operand<'a>>,
) -> Result<ArgumentBlock<'a>> {
    let epi = cached_epilogue(variant, &config_for::<A, D>())?;
    let operands = EpilogueOperands {
        scale_a: Some(scale_a),
        scale_b: Some(scale_b),
        bias,
        multiplier,
    };
    epi.build_arguments(acc, operands)
}

/// Evaluate an argument block from [`build_arguments`] over `acc`.
///
/// The variant is taken from the block; `A` and `D` must match the types the
/// block was built for.
pub fn evaluate_epilogue<A: Element, D: Element>(
    args: &ArgumentBlock<'_>,
    acc: &AccumulatorTile<'_, A>,
) -> Result<OutputTile<D>> {
    let variant = args.variant().ok_or_else(|| {
        EpilogueError::ArgumentShape("argument block was not built for a fixed variant".into())
    })?;
    let epi = cached_epilogue(variant, &config_for::<A, D>())?;
    epi.evaluate(args, acc)
}

fn run<A: Element, D: Element>(
    variant: EpilogueVariant,
    acc: &[A],
    m: usize,
    n: usize,
    operands: EpilogueOperands<'_>,
) -> Result<Vec<D>> {
    let tile = AccumulatorTile::new(acc, m, n)?;
    let epi = cached_epilogue(variant, &config_for::<A, D>())?;
    let args = epi.build_arguments(&tile, operands)?;
    Ok(epi.evaluate::<A, D>(&args, &tile)?.into_vec())
}

/// One-shot dequantization: `D = scale_a * (scale_b * acc)`.
///
/// # Arguments
/// - `acc`: accumulator in row-major order, `m x n`
/// - `scale_a`: one scale, or one per row
/// - `scale_b`: one scale, or one per column
///
/// # Example
///
/// ```
/// use scaled_epilogue::scaled_epilogue;
///
/// let acc = vec![1.0f32, 2.0, 3.0, 4.0]; // 2x2
/// let out: Vec<f32> = scaled_epilogue(&acc, 2, 2, &[2.0, 3.0], &[10.0, 100.0]).unwrap();
/// assert_eq!(out, vec![20.0, 400.0, 90.0, 1200.0]);
/// ```
pub fn scaled_epilogue<A: Element, D: OperandElement>(
    acc: &[A],
    m: usize,
    n: usize,
    scale_a: &[f32],
    scale_b: &[f32],
) -> Result<Vec<D>> {
    run(
        EpilogueVariant::Scaled,
        acc,
        m,
        n,
        EpilogueOperands::new(scale_a, scale_b),
    )
}

/// One-shot `D = scale_a * (scale_b * acc) + bias`, with one bias per column.
///
/// # Example
///
/// ```
/// use scaled_epilogue::scaled_epilogue_bias;
///
/// let acc = vec![1i32, 2, 3, 4]; // 2x2 int8 GEMM accumulator
/// let out: Vec<f32> =
///     scaled_epilogue_bias(&acc, 2, 2, &[2.0, 3.0], &[10.0, 100.0], &[1.0, 1.0]).unwrap();
/// assert_eq!(out, vec![21.0, 401.0, 91.0, 1201.0]);
/// ```
pub fn scaled_epilogue_bias<A: Element, D: OperandElement>(
    acc: &[A],
    m: usize,
    n: usize,
    scale_a: &[f32],
    scale_b: &[f32],
    bias: &[D],
) -> Result<Vec<D>> {
    run(
        EpilogueVariant::ScaledBias,
        acc,
        m,
        n,
        EpilogueOperands::new(scale_a, scale_b).with_bias(D::operand(bias)),
    )
}

/// One-shot `D = ls * (scale_a * (scale_b * acc))`, with one `ls` per column.
pub fn scaled_epilogue_ls<A: Element, D: OperandElement>(
    acc: &[A],
    m: usize,
    n: usize,
    scale_a: &[f32],
    scale_b: &[f32],
    ls: &[D],
) -> Result<Vec<D>> {
    run(
        EpilogueVariant::ScaledLs,
        acc,
        m,
        n,
        EpilogueOperands::new(scale_a, scale_b).with_multiplier(D::operand(ls)),
    )
}

/// One-shot `D = ls * (scale_a * (scale_b * acc) + bias)`.
///
/// The bias is added before the multiplier is applied.
pub fn scaled_epilogue_bias_ls<A: Element, D: OperandElement>(
    acc: &[A],
    m: usize,
    n: usize,
    scale_a: &[f32],
    scale_b: &[f32],
    bias: &[D],
    ls: &[D],
) -> Result<Vec<D>> {
    run(
        EpilogueVariant::ScaledBiasLs,
        acc,
        m,
        n,
        EpilogueOperands::new(scale_a, scale_b)
            .with_bias(D::operand(bias))
            .with_multiplier(D::operand(ls)),
    )
}
