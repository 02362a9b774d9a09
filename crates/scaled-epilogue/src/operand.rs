//! Borrowed operand handles passed in per launch.

use crate::types::{Element, ElementType};
use half::{bf16, f16};

/// A runtime operand array: element type, element count and data, borrowed
/// from the caller for the duration of one launch.
///
/// An empty slice denotes an absent operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    F32(&'a [f32]),
    F16(&'a [f16]),
    BF16(&'a [bf16]),
}

impl<'a> Operand<'a> {
    pub fn element_type(&self) -> ElementType {
        match self {
            Operand::F32(_) => ElementType::F32,
            Operand::F16(_) => ElementType::F16,
            Operand::BF16(_) => ElementType::BF16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Operand::F32(s) => s.len(),
            Operand::F16(s) => s.len(),
            Operand::BF16(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` widened to `f32`.
    #[inline]
    pub fn get_f32(&self, index: usize) -> f32 {
        match self {
            Operand::F32(s) => s[index],
            Operand::F16(s) => s[index].to_f32(),
            Operand::BF16(s) => s[index].to_f32(),
        }
    }

    /// Start address of the borrowed data, for identity comparisons.
    pub fn as_ptr(&self) -> *const u8 {
        match self {
            Operand::F32(s) => s.as_ptr().cast(),
            Operand::F16(s) => s.as_ptr().cast(),
            Operand::BF16(s) => s.as_ptr().cast(),
        }
    }
}

impl<'a> From<&'a [f32]> for Operand<'a> {
    fn from(s: &'a [f32]) -> Self {
        Operand::F32(s)
    }
}

impl<'a> From<&'a [f16]> for Operand<'a> {
    fn from(s: &'a [f16]) -> Self {
        Operand::F16(s)
    }
}

impl<'a> From<&'a [bf16]> for Operand<'a> {
    fn from(s: &'a [bf16]) -> Self {
        Operand::BF16(s)
    }
}

impl<'a> From<&'a Vec<f32>> for Operand<'a> {
    fn from(v: &'a Vec<f32>) -> Self {
        Operand::F32(v)
    }
}

impl<'a> From<&'a Vec<f16>> for Operand<'a> {
    fn from(v: &'a Vec<f16>) -> Self {
        Operand::F16(v)
    }
}

impl<'a> From<&'a Vec<bf16>> for Operand<'a> {
    fn from(v: &'a Vec<bf16>) -> Self {
        Operand::BF16(v)
    }
}

/// Slice types that convert into an [`Operand`] of their own element type.
pub trait OperandElement: Element {
    fn operand(data: &[Self]) -> Operand<'_>;
}

impl OperandElement for f32 {
    fn operand(data: &[Self]) -> Operand<'_> {
        Operand::F32(data)
    }
}

impl OperandElement for f16 {
    fn operand(data: &[Self]) -> Operand<'_> {
        Operand::F16(data)
    }
}

impl OperandElement for bf16 {
    fn operand(data: &[Self]) -> Operand<'_> {
        Operand::BF16(data)
    }
}
