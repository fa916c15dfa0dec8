//! Checked numeric conversions for pixel coordinates

use crate::{Error, Result};

/// Truncate f64 toward zero into i32
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is intended
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Clamp and convert f32 to i32 for pixel coordinates
///
/// Non-finite input maps to `min`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Acceptable for clamping bounds
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_i32_truncates_toward_zero() {
        assert_eq!(f64_to_i32(199.99).unwrap(), 199);
        assert_eq!(f64_to_i32(-0.9).unwrap(), 0);
        assert_eq!(f64_to_i32(-1.5).unwrap(), -1);

        assert!(f64_to_i32(f64::NAN).is_err());
        assert!(f64_to_i32(f64::INFINITY).is_err());
        assert!(f64_to_i32(1e10).is_err());
    }

    #[test]
    fn test_f32_to_i32_clamp() {
        assert_eq!(f32_to_i32_clamp(50.7, 0, 100), 50);
        assert_eq!(f32_to_i32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(150.0, 0, 100), 100);
        assert_eq!(f32_to_i32_clamp(f32::NAN, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(5.0, 100, 0), 5);
    }

    proptest! {
        #[test]
        fn prop_f32_to_i32_clamp_within_bounds(
            value in any::<f32>(),
            min in -10_000i32..10_000,
            max in -10_000i32..10_000
        ) {
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            let result = f32_to_i32_clamp(value, min, max);
            prop_assert!(result >= lo && result <= hi);
        }
    }
}
