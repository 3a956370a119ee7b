//! Lateral control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for lateral control, loaded from `lat_ctrl.toml`.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Control cycle period.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Solver cost on the deviation from the predicted path
    pub path_cost: f64,

    /// Solver cost on the deviation from the lane centre
    pub lane_cost: f64,

    /// Solver cost on the heading error
    pub heading_cost: f64,

    /// Speed below which the steering command is forced to zero.
    ///
    /// Units: meters/second
    pub min_active_speed_ms: f64,

    /// Lowest speed passed to the trajectory solver.
    ///
    /// Units: meters/second
    pub min_solver_speed_ms: f64,

    /// Speed above which the controller is allowed to report saturation.
    ///
    /// Units: meters/second
    pub sat_check_min_speed_ms: f64,

    /// Error band around the desired angle in which feedback is suppressed.
    ///
    /// Units: degrees
    pub deadzone_deg: f64,

    /// Minimum time between two warnings about the same fault.
    ///
    /// Units: seconds
    pub warn_period_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.01,
            path_cost: 1.0,
            lane_cost: 3.0,
            heading_cost: 1.0,
            min_active_speed_ms: 0.3,
            min_solver_speed_ms: 5.0,
            sat_check_min_speed_ms: 10.0,
            deadzone_deg: 0.0,
            warn_period_s: 5.0,
        }
    }
}
