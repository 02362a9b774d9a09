use super::{
    bias_load, multiplier_load, scale_a_load, scale_b_load, scale_b_times_acc,
    scale_b_times_acc_args,
};
use super::{Epilogue, EpilogueVariant};
use crate::core::{
    args_from_operand, ArgumentBlock, ComputeNode, EpilogueNode, EpilogueOperands, EpilogueTree,
    NodeArgs, OperandRole,
};
use crate::error::Result;
use crate::operand::Operand;
use crate::types::ElementType;
use tracing::instrument;

/// `D = ls * (scale_a * (scale_b * acc) + bias)`
///
/// The bias is added inside the outer multiplication. Both bias and `ls`
/// are per-output-channel vectors of the output type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledEpilogueBiasLs {
    tree: EpilogueTree,
}

impl ScaledEpilogueBiasLs {
    pub fn new(accumulator: ElementType, output: ElementType) -> Result<Self> {
        let evt1 = EpilogueNode::compute(
            ComputeNode::multiply_add(ElementType::F32),
            vec![
                EpilogueNode::load(scale_a_load()),
                scale_b_times_acc(),
                EpilogueNode::load(bias_load(output)),
            ],
        );
        let root = EpilogueNode::compute(
            ComputeNode::multiply(output),
            vec![EpilogueNode::load(multiplier_load(output)), evt1],
        );
        Ok(Self {
            tree: EpilogueTree::new(root, accumulator)?,
        })
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(a = a_scales.len(), b = b_scales.len(), bias = bias.len(), ls = ls.len())
    )]
    pub fn prepare_args<'a>(
        &self,
        a_scales: Operand<'a>,
        b_scales: Operand<'a>,
        bias: Operand<'a>,
        ls: Operand<'a>,
    ) -> Result<ArgumentBlock<'a>> {
        let output = self.tree.output_type();
        let b_args = args_from_operand(&scale_b_load(), b_scales)?;
        let a_args = args_from_operand(&scale_a_load(), a_scales)?;
        let bias_args = args_from_operand(&bias_load(output), bias)?;
        let ls_args = args_from_operand(&multiplier_load(output), ls)?;

        let evt0_args = scale_b_times_acc_args(b_args);
        let evt1_args = NodeArgs::compute(vec![
            NodeArgs::Load(a_args),
            evt0_args,
            NodeArgs::Load(bias_args),
        ]);
        Ok(ArgumentBlock::new(
            Some(Self::VARIANT),
            NodeArgs::compute(vec![NodeArgs::Load(ls_args), evt1_args]),
        ))
    }
}

impl Epilogue for ScaledEpilogueBiasLs {
    const VARIANT: EpilogueVariant = EpilogueVariant::ScaledBiasLs;

    fn tree(&self) -> &EpilogueTree {
        &self.tree
    }

    fn prepare_operands<'a>(&self, operands: &EpilogueOperands<'a>) -> Result<ArgumentBlock<'a>> {
        self.prepare_args(
            operands.require(OperandRole::ScaleA)?,
            operands.require(OperandRole::ScaleB)?,
            operands.require(OperandRole::Bias)?,
            operands.require(OperandRole::Multiplier)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EpilogueError;
    use crate::tile::AccumulatorTile;

    const ACC: [f32; 4] = [1.0, 2.0, 3.0, 4.0];

    /// Evaluate the 2x2 tile `ACC` with a = [2, 3] and b = [10, 100].
    fn run(bias: &[f32], ls: &[f32]) -> Vec<f32> {
        let (a, b) = ([2.0f32, 3.0], [10.0f32, 100.0]);
        let epi = ScaledEpilogueBiasLs::new(ElementType::F32, ElementType::F32).unwrap();
        let tile = AccumulatorTile::new(&ACC, 2, 2).unwrap();
        let args = epi
            .prepare_args(Operand::F32(&a), Operand::F32(&b), Operand::F32(bias), Operand::F32(ls))
            .unwrap();
        epi.evaluate::<f32, f32>(&args, &tile).unwrap().into_vec()
    }

    #[test]
    fn test_bias_added_before_multiplier() {
        let out = run(&[1.0, 1.0], &[2.0, 3.0]);
        // ls * (a*b*acc + bias), not ls * (a*b*acc) + bias
        assert_eq!(out, vec![42.0, 1203.0, 182.0, 3603.0]);
        assert_ne!(out, vec![41.0, 1201.0, 181.0, 3601.0]);
    }

    #[test]
    fn test_unit_multiplier_matches_bias_only() {
        let out = run(&[1.0, 1.0], &[1.0, 1.0]);
        assert_eq!(out, vec![21.0, 401.0, 91.0, 1201.0]);
    }

    #[test]
    fn test_all_operands_required() {
        let epi = ScaledEpilogueBiasLs::new(ElementType::F32, ElementType::F32).unwrap();
        let ops = EpilogueOperands::new(&[1.0f32][..], &[1.0f32][..]).with_bias(&[0.0f32][..]);
        let err = epi.prepare_operands(&ops).unwrap_err();
        assert_eq!(err, EpilogueError::MissingOperand("multiplier"));
    }

    #[test]
    fn test_tree_roles_innermost_last() {
        let epi = ScaledEpilogueBiasLs::new(ElementType::I32, ElementType::F32).unwrap();
        assert_eq!(
            epi.tree().roles(),
            vec![
                OperandRole::Multiplier,
                OperandRole::ScaleA,
                OperandRole::ScaleB,
                OperandRole::Bias
            ]
        );
    }
}
