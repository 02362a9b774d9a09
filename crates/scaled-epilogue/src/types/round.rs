/// Rounding applied when a compute node narrows its `f32` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoundStyle {
    /// Round to nearest, ties to even.
    #[default]
    ToNearest,
    /// Round toward zero (truncate).
    TowardZero,
}

/// Narrow to a half-precision type with truncation.
///
/// The nearest representable value is stepped one ulp toward zero when it
/// overshoots the input in magnitude. Half types are sign-magnitude, so
/// decrementing the bit pattern always shrinks the magnitude.
macro_rules! half_toward_zero {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(value: f32) -> $ty {
            let nearest = <$ty>::from_f32(value);
            if value.is_nan() || value.is_infinite() {
                return nearest;
            }
            if nearest.to_f32().abs() > value.abs() {
                <$ty>::from_bits(nearest.to_bits() - 1)
            } else {
                nearest
            }
        }
    };
}

half_toward_zero!(f16_toward_zero, half::f16);
half_toward_zero!(bf16_toward_zero, half::bf16);
