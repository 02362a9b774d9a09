use super::round::{bf16_toward_zero, f16_toward_zero, RoundStyle};
use half::{bf16, f16};
use std::fmt;

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F16,
    BF16,
    I32,
}

impl ElementType {
    /// Whether this type may be produced by a compute node.
    pub fn is_float(&self) -> bool {
        !matches!(self, ElementType::I32)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::F32 => "f32",
            ElementType::F16 => "f16",
            ElementType::BF16 => "bf16",
            ElementType::I32 => "i32",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host scalar that can enter or leave an epilogue.
pub trait Element: Copy + Default + Send + Sync + fmt::Debug + 'static {
    /// Tag for this element type.
    const TYPE: ElementType;

    /// Widen to the `f32` compute type.
    fn to_f32(self) -> f32;

    /// Narrow from the `f32` compute type.
    fn from_f32_rounded(value: f32, round: RoundStyle) -> Self;
}

impl Element for f32 {
    const TYPE: ElementType = ElementType::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32_rounded(value: f32, _round: RoundStyle) -> Self {
        value
    }
}

impl Element for f16 {
    const TYPE: ElementType = ElementType::F16;

    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    #[inline]
    fn from_f32_rounded(value: f32, round: RoundStyle) -> Self {
        match round {
            RoundStyle::ToNearest => f16::from_f32(value),
            RoundStyle::TowardZero => f16_toward_zero(value),
        }
    }
}

impl Element for bf16 {
    const TYPE: ElementType = ElementType::BF16;

    #[inline]
    fn to_f32(self) -> f32 {
        bf16::to_f32(self)
    }

    #[inline]
    fn from_f32_rounded(value: f32, round: RoundStyle) -> Self {
        match round {
            RoundStyle::ToNearest => bf16::from_f32(value),
            RoundStyle::TowardZero => bf16_toward_zero(value),
        }
    }
}

impl Element for i32 {
    const TYPE: ElementType = ElementType::I32;

    // Large accumulators lose low bits here; int-to-float `as` rounds to nearest.
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    /// Saturating; NaN maps to 0.
    #[inline]
    fn from_f32_rounded(value: f32, round: RoundStyle) -> Self {
        match round {
            RoundStyle::ToNearest => value.round_ties_even() as i32,
            RoundStyle::TowardZero => value as i32,
        }
    }
}

/// Round an `f32` through `ty` and widen it back, as a compute node does
/// between its own result and its parent.
pub(crate) fn round_through(ty: ElementType, value: f32, round: RoundStyle) -> f32 {
    match ty {
        ElementType::F32 => value,
        ElementType::F16 => f16::from_f32_rounded(value, round).to_f32(),
        ElementType::BF16 => bf16::from_f32_rounded(value, round).to_f32(),
        ElementType::I32 => i32::from_f32_rounded(value, round).to_f32(),
    }
}
