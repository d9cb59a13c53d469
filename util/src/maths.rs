//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    pi_t - rem_euclid(pi_t - angle, tau_t)
}

/// Mean of a set of angles.
///
/// A plain arithmetic mean is wrong near the +/-pi wrap, so the mean is taken
/// over the sine and cosine components and recombined with atan2. Returns
/// `None` for an empty slice.
pub fn mean_angle<T>(angles: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign,
{
    if angles.is_empty() {
        return None;
    }

    let mut sin_sum = T::from(0).unwrap();
    let mut cos_sum = T::from(0).unwrap();

    for a in angles {
        sin_sum += a.sin();
        cos_sum += a.cos();
    }

    Some(sin_sum.atan2(cos_sum))
}

/// Return the euclidean norm of the vector (dx, dy).
pub fn norm2<T>(dx: T, dy: T) -> T
where
    T: Float,
{
    dx.hypot(dy)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases, though floating point round-off can produce `r == rhs.abs()`
/// when `lhs` is very small and negative.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float + std::ops::Rem,
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0.0f64)).abs() < 1e-12);
        assert!((wrap_pi(PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(5.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-0.1f64) + 0.1).abs() < 1e-12);

        // Output is always in (-pi, pi]
        for i in -100..100 {
            let a = wrap_pi(0.37 * i as f64);
            assert!(a > -PI && a <= PI, "wrap_pi out of range: {}", a);
        }
    }

    #[test]
    fn test_mean_angle() {
        assert!(mean_angle::<f64>(&[]).is_none());

        let m = mean_angle(&[0.1f64, 0.3]).unwrap();
        assert!((m - 0.2).abs() < 1e-9);

        // Means near the wrap must not collapse to zero
        let m = mean_angle(&[PI - 0.05, -PI + 0.05]).unwrap();
        assert!((m.abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn test_norm2() {
        assert!((norm2(3.0f64, 4.0) - 5.0).abs() < 1e-12);
        assert!((norm2(0.0f64, 0.0)).abs() < 1e-12);
    }
}
