//! # Vehicle model
//!
//! Provides the vehicle parameters used by lateral control, and the steady state relationship
//! between steering angle and path curvature.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use util::maths::interp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle parameters, loaded from `vehicle.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CarParams {

    // ---- GEOMETRY ----

    /// Nominal ratio between steering wheel angle and road wheel angle.
    pub steer_ratio: f64,

    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Slip factor of the linear bicycle model. Negative for an understeering
    /// vehicle.
    ///
    /// Units: seconds^2/meters^2
    pub slip_factor: f64,

    // ---- ACTUATION ----

    /// Delay between a steering command and the actuator acting on it.
    ///
    /// Units: seconds
    pub steer_actuator_delay_s: f64,

    /// How the actuator interprets the steering command.
    pub steer_control_type: SteerControlType,

    /// Breakpoints of the maximum steering command curve.
    ///
    /// Units: meters/second
    pub steer_max_bp: Vec<f64>,

    /// Values of the maximum steering command curve.
    pub steer_max_v: Vec<f64>,

    // ---- TUNING ----

    /// Cost on the rate of change of steering given to the trajectory solver.
    pub steer_rate_cost: f64,

    /// Breakpoints of the proportional gain curve.
    ///
    /// Units: meters/second
    pub steer_kp_bp: Vec<f64>,

    /// Values of the proportional gain curve.
    pub steer_kp_v: Vec<f64>,

    /// Breakpoints of the integral gain curve.
    ///
    /// Units: meters/second
    pub steer_ki_bp: Vec<f64>,

    /// Values of the integral gain curve.
    pub steer_ki_v: Vec<f64>,

    /// Feedforward gain.
    pub steer_kf: f64,
}

/// Vehicle model wrapping the vehicle parameters.
#[derive(Debug, Clone)]
pub struct VehicleModel {
    cp: CarParams
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The quantity commanded by the steering actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteerControlType {
    /// The command is a torque, so feedforward scales with the tyre
    /// self-aligning moment.
    Torque,

    /// The command is an angle.
    Angle,
}

/// Errors found while validating vehicle parameters.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VehicleModelError {
    #[error("The {0} parameter must be strictly positive, found {1}")]
    NotPositive(&'static str, f64),

    #[error("The slip factor must be finite and not positive, found {0}")]
    InvalidSlipFactor(f64),

    #[error("The actuator delay must not be negative, found {0}")]
    NegativeDelay(f64),

    #[error("The {0} curve must be non-empty with as many values as breakpoints")]
    InvalidCurve(&'static str),

    #[error("The {0} curve breakpoints must be increasing")]
    UnsortedCurve(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleModel {
    /// Create a new model, validating the parameters.
    pub fn new(cp: CarParams) -> Result<Self, VehicleModelError> {
        if !(cp.steer_ratio > 0.0) {
            return Err(VehicleModelError::NotPositive("steer_ratio", cp.steer_ratio));
        }
        if !(cp.wheelbase_m > 0.0) {
            return Err(VehicleModelError::NotPositive("wheelbase_m", cp.wheelbase_m));
        }
        // A positive slip factor makes the curvature factor singular at
        // 1/sqrt(slip_factor)
        if !(cp.slip_factor.is_finite() && cp.slip_factor <= 0.0) {
            return Err(VehicleModelError::InvalidSlipFactor(cp.slip_factor));
        }
        if !(cp.steer_actuator_delay_s >= 0.0) {
            return Err(VehicleModelError::NegativeDelay(cp.steer_actuator_delay_s));
        }

        check_curve("steer_max", &cp.steer_max_bp, &cp.steer_max_v)?;
        check_curve("steer_kp", &cp.steer_kp_bp, &cp.steer_kp_v)?;
        check_curve("steer_ki", &cp.steer_ki_bp, &cp.steer_ki_v)?;

        Ok(Self { cp })
    }

    /// Get the vehicle parameters.
    pub fn params(&self) -> &CarParams {
        &self.cp
    }

    /// Ratio between the path curvature and the road wheel angle at the given
    /// speed.
    ///
    /// Units: 1/meters per radian
    pub fn curvature_factor(&self, v_ego: f64) -> f64 {
        let sf = self.cp.slip_factor;
        1.0 / (1.0 - sf * v_ego.powi(2)) / self.cp.wheelbase_m
    }

    /// Maximum magnitude of the steering command at the given speed.
    pub fn steer_max(&self, v_ego: f64) -> f64 {
        interp(v_ego, &self.cp.steer_max_bp, &self.cp.steer_max_v)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that a breakpoint curve can be interpolated.
fn check_curve(name: &'static str, bp: &[f64], v: &[f64]) -> Result<(), VehicleModelError> {
    if bp.is_empty() || bp.len() != v.len() {
        return Err(VehicleModelError::InvalidCurve(name));
    }

    if bp.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(VehicleModelError::UnsortedCurve(name));
    }

    Ok(())
}
