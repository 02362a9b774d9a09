use super::{bias_load, scale_a_load, scale_b_load, scale_b_times_acc, scale_b_times_acc_args};
use super::{Epilogue, EpilogueVariant};
use crate::core::{
    args_from_operand, ArgumentBlock, ComputeNode, EpilogueNode, EpilogueOperands, EpilogueTree,
    NodeArgs, OperandRole,
};
use crate::error::Result;
use crate::operand::Operand;
use crate::types::ElementType;
use tracing::instrument;

/// `D = scale_a * (scale_b * acc) + bias`
///
/// The bias is a per-output-channel vector of the output type. A per-tensor
/// activation zero-point correction can be pre-folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledEpilogueBias {
    tree: EpilogueTree,
}

impl ScaledEpilogueBias {
    pub fn new(accumulator: ElementType, output: ElementType) -> Result<Self> {
        let root = EpilogueNode::compute(
            ComputeNode::multiply_add(output),
            vec![
                EpilogueNode::load(scale_a_load()),
                scale_b_times_acc(),
                EpilogueNode::load(bias_load(output)),
            ],
        );
        Ok(Self {
            tree: EpilogueTree::new(root, accumulator)?,
        })
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(a = a_scales.len(), b = b_scales.len(), bias = bias.len())
    )]
    pub fn prepare_args<'a>(
        &self,
        a_scales: Operand<'a>,
        b_scales: Operand<'a>,
        bias: Operand<'a>,
    ) -> Result<ArgumentBlock<'a>> {
        let output = self.tree.output_type();
        let b_args = args_from_operand(&scale_b_load(), b_scales)?;
        let a_args = args_from_operand(&scale_a_load(), a_scales)?;
        let bias_args = args_from_operand(&bias_load(output), bias)?;

        let evt0_args = scale_b_times_acc_args(b_args);
        Ok(ArgumentBlock::new(
            Some(Self::VARIANT),
            NodeArgs::compute(vec![
                NodeArgs::Load(a_args),
                evt0_args,
                NodeArgs::Load(bias_args),
            ]),
        ))
    }
}

impl Epilogue for ScaledEpilogueBias {
    const VARIANT: EpilogueVariant = EpilogueVariant::ScaledBias;

    fn tree(&self) -> &EpilogueTree {
        &self.tree
    }

    fn prepare_operands<'a>(&self, operands: &EpilogueOperands<'a>) -> Result<ArgumentBlock<'a>> {
        self.prepare_args(
            operands.require(OperandRole::ScaleA)?,
            operands.require(OperandRole::ScaleB)?,
            operands.require(OperandRole::Bias)?,
        )
    }
}
