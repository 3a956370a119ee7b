//! # Planning interface
//!
//! The planner publishes a timestamped bundle of lane boundaries and paths,
//! expressed as polynomials in the vehicle's local frame. Lateral control
//! reads this bundle but never modifies it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of coefficients in a lane polynomial.
pub const POLY_LEN: usize = 4;

/// Number of coefficients in the desired path polynomial.
pub const D_POLY_LEN: usize = 3;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Cubic polynomial, highest power first, giving the lateral offset `y` (m) at a longitudinal
/// distance `x` (m) ahead of the vehicle.
pub type LanePoly = [f64; POLY_LEN];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Lane geometry produced by the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometry {
    /// Time at which the planner produced this geometry. A geometry only supersedes the previous
    /// one if its timestamp is strictly greater.
    ///
    /// Units: nanoseconds
    pub timestamp_ns: u64,

    /// Left lane line
    pub l_poly: LanePoly,

    /// Right lane line
    pub r_poly: LanePoly,

    /// Predicted path
    pub p_poly: LanePoly,

    /// Lane centre
    pub c_poly: LanePoly,

    /// Desired path (quadratic), only carried through to telemetry
    pub d_poly: [f64; D_POLY_LEN],

    /// Left lane line probability, between 0 and 1
    pub l_prob: f64,

    /// Right lane line probability, between 0 and 1
    pub r_prob: f64,

    /// Path probability, between 0 and 1
    pub p_prob: f64,

    /// Lane centre probability, between 0 and 1
    pub c_prob: f64,

    /// Lane width used by the planner.
    ///
    /// Units: meters
    pub lane_width: f64,

    /// Raw lane width estimate.
    ///
    /// Units: meters
    pub lane_width_estimate: f64,

    /// Certainty of the lane width estimate, between 0 and 1
    pub lane_width_certainty: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LaneGeometry {
    /// Returns true if this geometry should replace one with the given timestamp.
    pub fn is_newer_than(&self, timestamp_ns: u64) -> bool {
        self.timestamp_ns > timestamp_ns
    }

    /// Straight lane of the given width centred on the vehicle, with all lines fully visible.
    pub fn straight(timestamp_ns: u64, lane_width: f64) -> Self {
        let half_width = 0.5 * lane_width;

        Self {
            timestamp_ns,
            l_poly: [0.0, 0.0, 0.0, half_width],
            r_poly: [0.0, 0.0, 0.0, -half_width],
            l_prob: 1.0,
            r_prob: 1.0,
            p_prob: 1.0,
            c_prob: 1.0,
            lane_width,
            lane_width_estimate: lane_width,
            lane_width_certainty: 1.0,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_newer_than() {
        let geom = LaneGeometry::straight(100, 3.7);

        assert!(geom.is_newer_than(99));
        assert!(!geom.is_newer_than(100));
        assert!(!geom.is_newer_than(101));
    }

    #[test]
    fn test_straight() {
        let geom = LaneGeometry::straight(1, 4.0);

        assert_eq!(geom.l_poly, [0.0, 0.0, 0.0, 2.0]);
        assert_eq!(geom.r_poly, [0.0, 0.0, 0.0, -2.0]);
        assert_eq!(geom.p_poly, [0.0; POLY_LEN]);
        assert_eq!(geom.c_poly, [0.0; POLY_LEN]);
    }
}
