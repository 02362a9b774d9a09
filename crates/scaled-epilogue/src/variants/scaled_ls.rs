use super::{multiplier_load, scale_a_load, scale_b_load, scale_b_times_acc, scale_b_times_acc_args};
use super::{Epilogue, EpilogueVariant};
use crate::core::{
    args_from_operand, ArgumentBlock, ComputeNode, EpilogueNode, EpilogueOperands, EpilogueTree,
    NodeArgs, OperandRole,
};
use crate::error::Result;
use crate::operand::Operand;
use crate::types::ElementType;
use tracing::instrument;

/// `D = ls * (scale_a * (scale_b * acc))`
///
/// `ls` is a per-output-channel multiplier of the output type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledEpilogueLs {
    tree: EpilogueTree,
}

impl ScaledEpilogueLs {
    pub fn new(accumulator: ElementType, output: ElementType) -> Result<Self> {
        let evt1 = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![EpilogueNode::load(scale_a_load()), scale_b_times_acc()],
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
        fields(a = a_scales.len(), b = b_scales.len(), ls = ls.len())
    )]
    pub fn prepare_args<'a>(
        &self,
        a_scales: Operand<'a>,
        b_scales: Operand<'a>,
        ls: Operand<'a>,
    ) -> Result<ArgumentBlock<'a>> {
        let output = self.tree.output_type();
        let b_args = args_from_operand(&scale_b_load(), b_scales)?;
        let a_args = args_from_operand(&scale_a_load(), a_scales)?;
        let ls_args = args_from_operand(&multiplier_load(output), ls)?;

        let evt0_args = scale_b_times_acc_args(b_args);
        let evt1_args = NodeArgs::compute(vec![NodeArgs::Load(a_args), evt0_args]);
        Ok(ArgumentBlock::new(
            Some(Self::VARIANT),
            NodeArgs::compute(vec![NodeArgs::Load(ls_args), evt1_args]),
        ))
    }
}

impl Epilogue for ScaledEpilogueLs {
    const VARIANT: EpilogueVariant = EpilogueVariant::ScaledLs;

    fn tree(&self) -> &EpilogueTree {
        &self.tree
    }

    fn prepare_operands<'a>(&self, operands: &EpilogueOperands<'a>) -> Result<ArgumentBlock<'a>> {
        self.prepare_args(
            operands.require(OperandRole::ScaleA)?,
            operands.require(OperandRole::ScaleB)?,
            operands.require(OperandRole::Multiplier)?,
        )
    }
}
