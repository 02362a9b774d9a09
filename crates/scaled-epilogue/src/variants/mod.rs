//! The four fixed scaled-GEMM epilogues.
//!
//! Each variant dequantizes the accumulator with the A and B scales and
//! differs only in which per-channel operands follow:
//!
//! | Variant | Extra operands | Output |
//! |---------|----------------|--------|
//! | [`ScaledEpilogue`] | none | `D = a * (b * acc)` |
//! | [`ScaledEpilogueBias`] | bias | `D = a * (b * acc) + bias` |
//! | [`ScaledEpilogueLs`] | multiplier | `D = ls * (a * (b * acc))` |
//! | [`ScaledEpilogueBiasLs`] | bias, multiplier | `D = ls * (a * (b * acc) + bias)` |
//!
//! `a` is per-tensor or per-row, `b` is per-tensor or per-column; bias and
//! `ls` are always per-column vectors of the output type. The B scale is
//! applied first, then the A scale, then the bias, and the multiplier last.
//! Quantization is symmetric; an activation zero-point correction can be
//! folded into the bias by the caller.

mod scaled;
mod scaled_bias;
mod scaled_bias_ls;
mod scaled_ls;

pub use scaled::ScaledEpilogue;
pub use scaled_bias::ScaledEpilogueBias;
pub use scaled_bias_ls::ScaledEpilogueBiasLs;
pub use scaled_ls::ScaledEpilogueLs;

use crate::core::{
    ArgumentBlock, BroadcastDescriptor, ComputeNode, EpilogueNode, EpilogueOperands, EpilogueTree,
    LoadArgs, LoadKind, NodeArgs, OperandRole,
};
use crate::error::Result;
use crate::evaluate::evaluate_tree;
use crate::tile::{AccumulatorTile, OutputTile, TileShape};
use crate::types::{Element, ElementType};
use std::fmt;

/// Tag selecting one of the fixed epilogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpilogueVariant {
    Scaled,
    ScaledBias,
    ScaledLs,
    ScaledBiasLs,
}

impl EpilogueVariant {
    pub const ALL: [EpilogueVariant; 4] = [
        EpilogueVariant::Scaled,
        EpilogueVariant::ScaledBias,
        EpilogueVariant::ScaledLs,
        EpilogueVariant::ScaledBiasLs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EpilogueVariant::Scaled => "scaled",
            EpilogueVariant::ScaledBias => "scaled_bias",
            EpilogueVariant::ScaledLs => "scaled_ls",
            EpilogueVariant::ScaledBiasLs => "scaled_bias_ls",
        }
    }

    pub fn uses_bias(&self) -> bool {
        matches!(self, EpilogueVariant::ScaledBias | EpilogueVariant::ScaledBiasLs)
    }

    pub fn uses_multiplier(&self) -> bool {
        matches!(self, EpilogueVariant::ScaledLs | EpilogueVariant::ScaledBiasLs)
    }
}

impl fmt::Display for EpilogueVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configured fixed epilogue.
pub trait Epilogue: Send + Sync {
    const VARIANT: EpilogueVariant;

    fn tree(&self) -> &EpilogueTree;

    /// Build arguments from role-keyed operands.
    ///
    /// Operands the variant does not read are ignored here.
    fn prepare_operands<'a>(&self, operands: &EpilogueOperands<'a>) -> Result<ArgumentBlock<'a>>;

    /// Evaluate prepared arguments over one accumulator tile.
    fn evaluate<A: Element, D: Element>(
        &self,
        args: &ArgumentBlock<'_>,
        acc: &AccumulatorTile<'_, A>,
    ) -> Result<OutputTile<D>> {
        evaluate_tree(self.tree(), args, acc, TileShape::default())
    }
}

pub(crate) fn scale_a_load() -> BroadcastDescriptor {
    BroadcastDescriptor::new(LoadKind::ScalarOrRow, OperandRole::ScaleA, ElementType::F32)
}

pub(crate) fn scale_b_load() -> BroadcastDescriptor {
    BroadcastDescriptor::new(LoadKind::ScalarOrCol, OperandRole::ScaleB, ElementType::F32)
}

pub(crate) fn bias_load(output: ElementType) -> BroadcastDescriptor {
    BroadcastDescriptor::new(LoadKind::Col, OperandRole::Bias, output)
}

pub(crate) fn multiplier_load(output: ElementType) -> BroadcastDescriptor {
    BroadcastDescriptor::new(LoadKind::Col, OperandRole::Multiplier, output)
}

/// `scale_b * acc` in f32: the innermost node of every variant.
pub(crate) fn scale_b_times_acc() -> EpilogueNode {
    EpilogueNode::compute(
        ComputeNode::multiply(ElementType::F32),
        vec![EpilogueNode::load(scale_b_load()), EpilogueNode::Accumulator],
    )
}

pub(crate) fn scale_b_times_acc_args(b_args: LoadArgs<'_>) -> NodeArgs<'_> {
    NodeArgs::compute(vec![NodeArgs::Load(b_args), NodeArgs::Accumulator])
}
