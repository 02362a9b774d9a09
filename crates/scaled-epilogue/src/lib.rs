//! Fused dequantization epilogues for scaled (quantized) matrix multiplication.
//!
//! A quantized GEMM produces raw accumulator values; the epilogue rescales
//! them with per-tensor, per-row or per-column scales, optionally adds a
//! per-channel bias and optionally applies a per-channel multiplier, writing
//! the output tile in a single pass.
//!
//! | Variant | Formula |
//! |---------|---------|
//! | [`EpilogueVariant::Scaled`] | `D = a * (b * acc)` |
//! | [`EpilogueVariant::ScaledBias`] | `D = a * (b * acc) + bias` |
//! | [`EpilogueVariant::ScaledLs`] | `D = ls * (a * (b * acc))` |
//! | [`EpilogueVariant::ScaledBiasLs`] | `D = ls * (a * (b * acc) + bias)` |
//!
//! # Quick Start
//!
//! ```
//! use scaled_epilogue::scaled_epilogue;
//!
//! // int8 GEMM accumulator, per-row activation scales, per-tensor weight scale
//! let acc = vec![1i32, 2, 3, 4];
//! let out: Vec<f32> = scaled_epilogue(&acc, 2, 2, &[2.0, 3.0], &[0.5]).unwrap();
//! assert_eq!(out, vec![1.0, 2.0, 4.5, 6.0]);
//! ```
//!
//! # Per-Launch Arguments
//!
//! For repeated launches, build arguments once per launch and evaluate them
//! against the accumulator tile:
//!
//! ```
//! use half::f16;
//! use scaled_epilogue::{
//!     build_arguments, evaluate_epilogue, AccumulatorTile, EpilogueVariant, Operand,
//!     OutputTile,
//! };
//!
//! let acc = [1.0f32, 2.0, 3.0, 4.0];
//! let tile = AccumulatorTile::new(&acc, 2, 2).unwrap();
//! let bias = [f16::ONE, f16::ONE];
//!
//! let args = build_arguments::<f16, _>(
//!     EpilogueVariant::ScaledBias,
//!     &tile,
//!     Operand::F32(&[2.0, 3.0]),
//!     Operand::F32(&[10.0, 100.0]),
//!     Some(Operand::F16(&bias)),
//!     None,
//! )
//! .unwrap();
//! let out: OutputTile<f16> = evaluate_epilogue(&args, &tile).unwrap();
//! assert_eq!(out.to_f32_vec(), vec![21.0, 401.0, 91.0, 1201.0]);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): evaluate row bands of a tile on the rayon pool.

pub mod api;
pub mod builder;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluate;
pub mod operand;
pub mod tile;
pub mod types;
pub mod variants;

pub use api::{
    build_arguments, evaluate_epilogue, scaled_epilogue, scaled_epilogue_bias,
    scaled_epilogue_bias_ls, scaled_epilogue_ls,
};
pub use builder::ScaledMmEpilogue;
pub use cache::cached_epilogue;
pub use config::EpilogueConfig;
pub use crate::core::{
    ArgumentBlock, BroadcastDescriptor, BroadcastMode, ComputeNode, ComputeOp, EpilogueNode,
    EpilogueOperands, EpilogueTree, LoadKind, OperandRole,
};
pub use error::{EpilogueError, Result};
pub use evaluate::evaluate_tree;
pub use operand::{Operand, OperandElement};
pub use tile::{AccumulatorTile, OutputTile, TileShape};
pub use types::{Element, ElementType, RoundStyle};
pub use variants::{
    Epilogue, EpilogueVariant, ScaledEpilogue, ScaledEpilogueBias, ScaledEpilogueBiasLs,
    ScaledEpilogueLs,
};
