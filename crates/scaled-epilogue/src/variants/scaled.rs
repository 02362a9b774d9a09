use super::{scale_a_load, scale_b_load, scale_b_times_acc, scale_b_times_acc_args};
use super::{Epilogue, EpilogueVariant};
use crate::core::{
    args_from_operand, ArgumentBlock, ComputeNode, EpilogueNode, EpilogueOperands, EpilogueTree,
    NodeArgs, OperandRole,
};
use crate::error::Result;
use crate::operand::Operand;
use crate::types::ElementType;
use tracing::instrument;

/// `D = scale_a * (scale_b * acc)`
///
/// Equivalent to `torch._scaled_mm` with symmetric per-tensor, per-row or
/// per-column scales in any combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledEpilogue {
    tree: EpilogueTree,
}

impl ScaledEpilogue {
    pub fn new(accumulator: ElementType, output: ElementType) -> Result<Self> {
        let root = EpilogueNode::compute(
            ComputeNode::multiply(output),
            vec![EpilogueNode::load(scale_a_load()), scale_b_times_acc()],
        );
        Ok(Self {
            tree: EpilogueTree::new(root, accumulator)?,
        })
    }

    #[instrument(level = "debug", skip_all, fields(a = a_scales.len(), b = b_scales.len()))]
    pub fn prepare_args<'a>(
        &self,
        a_scales: Operand<'a>,
        b_scales: Operand<'a>,
    ) -> Result<ArgumentBlock<'a>> {
        let b_args = args_from_operand(&scale_b_load(), b_scales)?;
        let a_args = args_from_operand(&scale_a_load(), a_scales)?;

        let evt0_args = scale_b_times_acc_args(b_args);
        Ok(ArgumentBlock::new(
            Some(Self::VARIANT),
            NodeArgs::compute(vec![NodeArgs::Load(a_args), evt0_args]),
        ))
    }
}

impl Epilogue for ScaledEpilogue {
    const VARIANT: EpilogueVariant = EpilogueVariant::Scaled;

    fn tree(&self) -> &EpilogueTree {
        &self.tree
    }

    fn prepare_operands<'a>(&self, operands: &EpilogueOperands<'a>) -> Result<ArgumentBlock<'a>> {
        self.prepare_args(
            operands.require(OperandRole::ScaleA)?,
            operands.require(OperandRole::ScaleB)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BroadcastMode;
    use crate::error::EpilogueError;
    use crate::tile::AccumulatorTile;
    use half::f16;

    #[test]
    fn test_scaled_per_row_per_col() {
        let epi = ScaledEpilogue::new(ElementType::F32, ElementType::F32).unwrap();
        let acc = [1.0f32, 2.0, 3.0, 4.0];
        let tile = AccumulatorTile::new(&acc, 2, 2).unwrap();
        let a = [2.0f32, 3.0];
        let b = [10.0f32, 100.0];

        let args = epi.prepare_args(Operand::F32(&a), Operand::F32(&b)).unwrap();
        let out = epi.evaluate::<f32, f32>(&args, &tile).unwrap();

        assert_eq!(out.as_slice(), &[20.0, 400.0, 90.0, 1200.0]);
    }

    #[test]
    fn test_scaled_scalar_scales() {
        let epi = ScaledEpilogue::new(ElementType::I32, ElementType::F32).unwrap();
        let acc = [1i32, -2, 3, 4, 5, 6];
        let tile = AccumulatorTile::new(&acc, 2, 3).unwrap();

        let args = epi.prepare_args(Operand::F32(&[0.5]), Operand::F32(&[4.0])).unwrap();
        assert_eq!(args.load_args(OperandRole::ScaleA).unwrap().mode(), BroadcastMode::Scalar);
        assert_eq!(args.load_args(OperandRole::ScaleB).unwrap().mode(), BroadcastMode::Scalar);

        let out = epi.evaluate::<i32, f32>(&args, &tile).unwrap();
        assert_eq!(out.as_slice(), &[2.0, -4.0, 6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn test_scaled_f16_output() {
        let epi = ScaledEpilogue::new(ElementType::I32, ElementType::F16).unwrap();
        let acc = [100i32, 200];
        let tile = AccumulatorTile::new(&acc, 1, 2).unwrap();

        let args = epi.prepare_args(Operand::F32(&[0.25]), Operand::F32(&[0.5, 2.0])).unwrap();
        let out = epi.evaluate::<i32, f16>(&args, &tile).unwrap();
        assert_eq!(out.as_slice(), &[f16::from_f32(12.5), f16::from_f32(100.0)]);
    }

    #[test]
    fn test_scaled_rejects_missing_scale() {
        let epi = ScaledEpilogue::new(ElementType::F32, ElementType::F32).unwrap();
        let err = epi.prepare_args(Operand::F32(&[1.0]), Operand::F32(&[])).unwrap_err();
        assert_eq!(err, EpilogueError::MissingOperand("scale_b"));
    }

    #[test]
    fn test_scaled_prepare_is_deterministic() {
        let epi = ScaledEpilogue::new(ElementType::F32, ElementType::F32).unwrap();
        let a = [1.0f32, 2.0];
        let b = [3.0f32];
        let first = epi.prepare_args(Operand::F32(&a), Operand::F32(&b)).unwrap();
        let second = epi.prepare_args(Operand::F32(&a), Operand::F32(&b)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.variant(), Some(EpilogueVariant::Scaled));
    }
}
