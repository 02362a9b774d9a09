//! Elementwise compute nodes.

use crate::types::{round_through, ElementType, RoundStyle};

/// Binary or ternary elementwise operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeOp {
    /// `x * y`
    Multiply,
    /// `x * y + z`, fused.
    MultiplyAdd,
}

impl ComputeOp {
    /// Number of child values consumed.
    pub fn arity(&self) -> usize {
        match self {
            ComputeOp::Multiply => 2,
            ComputeOp::MultiplyAdd => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComputeOp::Multiply => "multiplies",
            ComputeOp::MultiplyAdd => "multiply_add",
        }
    }
}

/// An operator applied to already-loaded child values at one coordinate.
///
/// Inputs are computed in `f32`; the result is narrowed to `output` with
/// `round` before it reaches the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputeNode {
    pub op: ComputeOp,
    pub output: ElementType,
    pub round: RoundStyle,
}

impl ComputeNode {
    pub fn new(op: ComputeOp, output: ElementType) -> Self {
        Self {
            op,
            output,
            round: RoundStyle::ToNearest,
        }
    }

    pub fn multiply(output: ElementType) -> Self {
        Self::new(ComputeOp::Multiply, output)
    }

    pub fn multiply_add(output: ElementType) -> Self {
        Self::new(ComputeOp::MultiplyAdd, output)
    }

    pub fn with_round(mut self, round: RoundStyle) -> Self {
        self.round = round;
        self
    }

    /// Apply the operator. `inputs.len()` must equal the operator's arity.
    #[inline]
    pub fn apply(&self, inputs: &[f32]) -> f32 {
        debug_assert_eq!(inputs.len(), self.op.arity());
        let value = match self.op {
            ComputeOp::Multiply => inputs[0] * inputs[1],
            ComputeOp::MultiplyAdd => inputs[0].mul_add(inputs[1], inputs[2]),
        };
        round_through(self.output, value, self.round)
    }
}
