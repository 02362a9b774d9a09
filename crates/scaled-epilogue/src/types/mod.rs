//! Numeric element types flowing through an epilogue.
//!
//! Every compute node works in `f32`. Values enter the tree from the
//! accumulator tile or from broadcast operands, are widened to `f32`, and
//! leave each compute node narrowed to that node's declared output type.
//!
//! | Type | Tag | Role |
//! |------|-----|------|
//! | `f32` | [`ElementType::F32`] | accumulator, scales, bias/multiplier, output |
//! | [`half::f16`] | [`ElementType::F16`] | bias/multiplier, output |
//! | [`half::bf16`] | [`ElementType::BF16`] | bias/multiplier, output |
//! | `i32` | [`ElementType::I32`] | accumulator of int8 GEMMs only |
//!
//! # Rounding
//!
//! Narrowing conversions follow a [`RoundStyle`]. The fixed variants always
//! round to nearest (ties to even); custom trees may truncate instead.
//!
//! ```rust
//! use half::f16;
//! use scaled_epilogue::types::{Element, RoundStyle};
//!
//! let x = f16::from_f32_rounded(1.0009766, RoundStyle::ToNearest);
//! assert_eq!(x, f16::from_f32(1.0009766));
//! ```

mod element;
mod round;

pub(crate) use element::round_through;
pub use element::{Element, ElementType};
pub use round::RoundStyle;
