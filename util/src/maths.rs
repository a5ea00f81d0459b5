//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value between min and max.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Shift `value` (degrees) by whole turns so that it lies within 180 degrees
/// of `prev`.
///
/// Applying this to every element of a sequence of wrapped angles produces a
/// continuous (unwrapped) sequence.
pub fn unwrap_deg<T>(prev: T, value: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    let turn = T::from(360.0).unwrap();

    let delta = rem_euclid(value - prev + half_turn, turn) - half_turn;

    prev + delta
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&2f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-2f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&0.5f64, &-1f64, &1f64), 0.5f64);
    }

    #[test]
    fn test_unwrap_deg() {
        assert_eq!(unwrap_deg(170f64, -170f64), 190f64);
        assert_eq!(unwrap_deg(-170f64, 170f64), -190f64);
        assert_eq!(unwrap_deg(10f64, 20f64), 20f64);
        assert_eq!(unwrap_deg(350f64, 5f64), 365f64);
        assert_eq!(unwrap_deg(720f64, 0f64), 720f64);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(-1f64, 360f64), 359f64);
        assert_eq!(rem_euclid(370f64, 360f64), 10f64);
    }
}
