//! The epilogue composition engine.
//!
//! An epilogue is a small expression tree evaluated once per output element
//! of a GEMM tile:
//!
//! ```text
//!            multiplies (D)                 D = scale_a * (scale_b * acc)
//!           /              \
//!   load scale_a        multiplies (f32)
//!   (scalar or row)     /           \
//!               load scale_b      accumulator
//!               (scalar or col)
//! ```
//!
//! Leaves are [`BroadcastDescriptor`]s (how one value is read for a given
//! coordinate) or the accumulator itself. Inner nodes are [`ComputeNode`]s
//! that combine already-loaded child values in `f32` and round the result to
//! their declared output type.
//!
//! Trees are validated when composed ([`EpilogueTree::new`]). Per launch,
//! the caller's operands are resolved into an [`ArgumentBlock`] with the same
//! shape, using the helpers in [`args`](args): a one-element operand is read
//! as a scalar, anything else is bound as a vector without copying.
//!
//! # Module Contents
//!
//! - [`broadcast`](broadcast): load kinds, descriptors, resolved load arguments
//! - [`compute`](compute): elementwise operators
//! - [`tree`](tree): expression trees, validation and evaluation
//! - [`args`](args): argument construction shared by every composition

pub mod args;
pub mod broadcast;
pub mod compute;
pub mod tree;

pub use args::{
    args_from_operand, args_from_optional_operand, ArgumentBlock, EpilogueOperands, NodeArgs,
};
pub use broadcast::{Axis, BroadcastDescriptor, BroadcastMode, LoadArgs, LoadKind, OperandRole};
pub use compute::{ComputeNode, ComputeOp};
pub use tree::{EpilogueNode, EpilogueTree};
