//! Engagement and output bounding

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Whether the feedback controller runs this cycle, and if not why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Engagement {
    /// Speed and activity allow control
    Engaged,

    /// The supervisor has not requested control
    Inactive,

    /// Travelling too slowly to steer
    BelowMinSpeed,

    /// A measured input is not finite
    InvalidInput,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Engagement {
    /// Decide the engagement from the cycle's inputs.
    pub fn assess(
        active: bool,
        v_ego: f64,
        angle_steers: f64,
        angle_offset: f64,
        min_speed_ms: f64
    ) -> Self {
        if !(v_ego.is_finite() && angle_steers.is_finite() && angle_offset.is_finite()) {
            Engagement::InvalidInput
        }
        else if v_ego < min_speed_ms {
            Engagement::BelowMinSpeed
        }
        else if !active {
            Engagement::Inactive
        }
        else {
            Engagement::Engaged
        }
    }

    pub fn is_engaged(&self) -> bool {
        *self == Engagement::Engaged
    }
}

impl Default for Engagement {
    fn default() -> Self {
        Engagement::Inactive
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Symmetric output limits for the given maximum command magnitude.
///
/// A negative or non-finite maximum gives a zero band.
pub fn output_limits(steer_max: f64) -> (f64, f64) {
    let max = if steer_max.is_finite() { steer_max.max(0.0) } else { 0.0 };
    (-max, max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_assess() {
        assert_eq!(Engagement::assess(true, 20.0, 1.0, 0.0, 0.3), Engagement::Engaged);
        assert_eq!(Engagement::assess(false, 20.0, 1.0, 0.0, 0.3), Engagement::Inactive);
        assert_eq!(Engagement::assess(true, 0.29, 1.0, 0.0, 0.3), Engagement::BelowMinSpeed);
        assert_eq!(Engagement::assess(true, 0.3, 1.0, 0.0, 0.3), Engagement::Engaged);
        assert_eq!(
            Engagement::assess(true, f64::NAN, 1.0, 0.0, 0.3),
            Engagement::InvalidInput
        );
        assert_eq!(
            Engagement::assess(true, 20.0, f64::INFINITY, 0.0, 0.3),
            Engagement::InvalidInput
        );
    }

    #[test]
    fn test_output_limits() {
        assert_eq!(output_limits(0.75), (-0.75, 0.75));
        assert_eq!(output_limits(-1.0), (-0.0, 0.0));
        assert_eq!(output_limits(f64::NAN), (-0.0, 0.0));
    }
}
