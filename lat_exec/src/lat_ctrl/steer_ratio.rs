//! Steering ratio model
//!
//! The effective steering ratio falls at large steering angles. The fall is
//! described by a ratio factor in `[RATIO_FACTOR_MIN, 1]` which multiplies the
//! nominal ratio.

/// Scale of the ratio reduction
pub const RATIO_SCALE: f64 = 20.0;

/// Exponent of the ratio reduction
pub const RATIO_EXP: f64 = 2.9;

/// Floor of the ratio factor, preventing a near zero effective ratio.
pub const RATIO_FACTOR_MIN: f64 = 0.1;

/// Ratio factor for the given measured steering angle (degrees).
///
/// `max(0.1, 1 - 20 |angle / 100|^2.9)`. Non-increasing in `|angle|` and total,
/// a non-finite angle gives the floor.
pub fn ratio_factor(angle_steers_deg: f64) -> f64 {
    let reduction = RATIO_SCALE * (angle_steers_deg / 100.0).abs().powf(RATIO_EXP);

    // `f64::max` returns the floor if the reduction is NaN
    RATIO_FACTOR_MIN.max(1.0 - reduction)
}

/// Effective steering ratio at the given measured steering angle (degrees).
pub fn effective_steer_ratio(nominal_ratio: f64, angle_steers_deg: f64) -> f64 {
    nominal_ratio * ratio_factor(angle_steers_deg)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ratio_factor_values() {
        assert_eq!(ratio_factor(0.0), 1.0);
        assert_eq!(ratio_factor(100.0), 0.1);
        assert_eq!(ratio_factor(-100.0), 0.1);
        assert_eq!(ratio_factor(f64::NAN), 0.1);
        assert_eq!(ratio_factor(f64::INFINITY), 0.1);

        // 1 - 20 * 0.1^2.9
        let expected = 1.0 - 20.0 * 0.1f64.powf(2.9);
        assert!((ratio_factor(10.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_factor_monotonic() {
        let mut prev = ratio_factor(0.0);

        for i in 1..=2000 {
            let angle = i as f64 * 0.1;
            let f = ratio_factor(angle);

            assert!(f <= prev, "factor increased at {} deg", angle);
            assert!(f >= RATIO_FACTOR_MIN);
            assert_eq!(f, ratio_factor(-angle));

            prev = f;
        }
    }

    #[test]
    fn test_effective_steer_ratio() {
        assert_eq!(effective_steer_ratio(15.0, 0.0), 15.0);
        assert!((effective_steer_ratio(15.0, 360.0) - 1.5).abs() < 1e-12);
    }
}
