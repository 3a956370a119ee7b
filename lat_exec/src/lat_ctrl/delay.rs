//! Actuator delay compensation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the vehicle relative to the lane, as seen by the trajectory solver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    /// Longitudinal position.
    ///
    /// Units: meters
    pub x: f64,

    /// Lateral offset.
    ///
    /// Units: meters
    pub y: f64,

    /// Heading error.
    ///
    /// Units: radians
    pub psi: f64,

    /// Road wheel angle.
    ///
    /// Units: radians
    pub delta: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Project the state forward by the actuator delay.
///
/// Uses a constant speed, constant curvature bicycle model: the vehicle travels
/// `v_ego * delay_s` and turns at the yaw rate produced by the measured
/// steering angle (degrees). `y` and `delta` are carried through unchanged.
pub fn states_after_delay(
    state: VehicleState,
    v_ego: f64,
    angle_steers_deg: f64,
    curvature_factor: f64,
    steer_ratio: f64,
    delay_s: f64,
) -> VehicleState {
    VehicleState {
        x: v_ego * delay_s,
        psi: v_ego * curvature_factor * angle_steers_deg.to_radians() / steer_ratio * delay_s,
        ..state
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_states_after_delay() {
        let state = VehicleState {
            x: 3.0,
            y: 0.5,
            psi: 0.2,
            delta: 0.01,
        };

        let out = states_after_delay(state, 20.0, 15.0, 0.4, 15.0, 0.1);

        assert!((out.x - 2.0).abs() < 1e-12);
        // 20 * 0.4 * rad(15) / 15 * 0.1
        let expected_psi = 20.0 * 0.4 * 15f64.to_radians() / 15.0 * 0.1;
        assert!((out.psi - expected_psi).abs() < 1e-12);
        assert_eq!(out.y, 0.5);
        assert_eq!(out.delta, 0.01);
    }

    #[test]
    fn test_states_after_delay_straight() {
        let out = states_after_delay(VehicleState::default(), 30.0, 0.0, 0.3, 15.0, 0.2);

        assert!((out.x - 6.0).abs() < 1e-12);
        assert_eq!(out.psi, 0.0);
    }
}
