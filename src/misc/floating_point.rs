use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Trait for floating point types (f32, f64)
/// Mainly used to identify the type of the field in nalgebra,
/// plus the spacing queries the knot checks rely on.
pub trait FloatingPoint: RealField + ToPrimitive + Copy {
    /// Distance from `|self|` to the next representable value.
    /// Returns the smallest normal value at zero.
    fn epsilon_at(self) -> Self;

    /// Smallest magnitude considered distinct from zero (weights, determinants).
    fn resolution() -> Self;
}

impl FloatingPoint for f32 {
    fn epsilon_at(self) -> Self {
        let a = self.abs();
        if a == 0. {
            return f32::MIN_POSITIVE;
        }
        if !a.is_finite() {
            return a;
        }
        f32::from_bits(a.to_bits() + 1) - a
    }

    fn resolution() -> Self {
        f32::MIN_POSITIVE
    }
}

impl FloatingPoint for f64 {
    fn epsilon_at(self) -> Self {
        let a = self.abs();
        if a == 0. {
            return f64::MIN_POSITIVE;
        }
        if !a.is_finite() {
            return a;
        }
        f64::from_bits(a.to_bits() + 1) - a
    }

    fn resolution() -> Self {
        f64::MIN_POSITIVE
    }
}
