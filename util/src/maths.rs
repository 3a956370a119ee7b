//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Piecewise linear interpolation of `value` over the curve given by the
/// breakpoints `xp` and the values `fp`.
///
/// Values outside of the breakpoint range are clamped to the first or last
/// value. `xp` must be increasing. If the curve is empty zero is returned, and
/// if the two slices differ in length only the common prefix is used.
pub fn interp<T>(value: T, xp: &[T], fp: &[T]) -> T
where
    T: Float
{
    let n = xp.len().min(fp.len());

    if n == 0 {
        return T::zero();
    }

    if value <= xp[0] {
        return fp[0];
    }
    if value >= xp[n - 1] {
        return fp[n - 1];
    }

    for i in 1..n {
        if value < xp[i] {
            return lin_map((xp[i - 1], xp[i]), (fp[i - 1], fp[i]), value);
        }
    }

    // Only reachable for a NaN value, which compares false against everything
    fp[n - 1]
}

/// Apply polynomial coefficients to a value
///
/// Coefficients are ordered highest power first.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    // Horner's method
    coeffs.iter().fold(T::zero(), |acc, &c| acc * value + c)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 10f64), (0f64, 1f64), 5f64), 0.5);
        assert_eq!(lin_map((0f64, 10f64), (1f64, 0f64), 10f64), 0f64);
    }

    #[test]
    fn test_interp() {
        let xp = [0f64, 10f64, 30f64];
        let fp = [1f64, 2f64, 0f64];

        // Inside the curve
        assert_eq!(interp(5f64, &xp, &fp), 1.5);
        assert_eq!(interp(20f64, &xp, &fp), 1.0);
        assert_eq!(interp(10f64, &xp, &fp), 2.0);

        // Clamped outside
        assert_eq!(interp(-1f64, &xp, &fp), 1.0);
        assert_eq!(interp(100f64, &xp, &fp), 0.0);

        // Single point curve is a constant
        assert_eq!(interp(7f64, &[3f64], &[4f64]), 4.0);

        // Empty curve
        assert_eq!(interp(7f64, &[], &[]), 0.0);
    }

    #[test]
    fn test_poly_val() {
        // 2x^3 + 0x^2 - x + 3
        let coeffs = [2f64, 0f64, -1f64, 3f64];

        assert_eq!(poly_val(0f64, &coeffs), 3.0);
        assert_eq!(poly_val(2f64, &coeffs), 17.0);
        assert_eq!(poly_val(-1f64, &coeffs), 2.0);
    }
}
