//! # Lateral controllers module
//!
//! Provides the PI controller which tracks the desired steering angle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use util::maths::interp;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Value of the saturation counter above which the controller is saturated.
const SAT_LIMIT: f64 = 0.8;

/// Minimum error magnitude for saturation to be counted.
const SAT_MIN_ERROR: f64 = 0.1;

/// Rate at which the integral is unwound during an override, per second.
const I_UNWIND_RATE: f64 = 0.3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Speed scheduled gain curve.
#[derive(Debug, Clone, Serialize)]
pub struct GainSchedule {
    /// Breakpoints
    ///
    /// Units: meters/second
    pub bp: Vec<f64>,

    /// Gains at each breakpoint
    pub v: Vec<f64>,
}

/// A PI controller with feedforward, anti-windup and saturation detection.
///
/// The gains are scaled down by the steer ratio factor, so that the controller
/// is more aggressive at large steering angles where the effective ratio is
/// smaller. The proportional and integral action are also scaled by the lane
/// probability factor.
#[derive(Debug, Clone, Serialize)]
pub struct PiController {
    /// Proportional gain curve
    k_p: GainSchedule,

    /// Integral gain curve
    k_i: GainSchedule,

    /// Feedforward gain
    k_f: f64,

    /// Controller period
    ///
    /// Units: seconds
    period_s: f64,

    /// Upper output limit
    pos_limit: f64,

    /// Lower output limit
    neg_limit: f64,

    /// Proportional term of the last update
    p: f64,

    /// The integral accumulation
    i: f64,

    /// Feedforward term of the last update
    f: f64,

    /// Saturation counter, in [0, 1]
    sat_count: f64,

    /// Whether the controller is saturated
    saturated: bool,

    /// Last output
    control: f64,
}

/// Inputs to a PI controller update.
#[derive(Debug, Clone, Copy)]
pub struct PiInput {
    /// Target value
    pub setpoint: f64,

    /// Measured value
    pub measurement: f64,

    /// Factor by which the gains are divided
    pub ratio_factor: f64,

    /// Factor by which the proportional and integral action is multiplied
    pub prob_factor: f64,

    /// Whether saturation should be counted
    pub check_saturation: bool,

    /// If true the integral is unwound rather than accumulated
    pub overriding: bool,

    /// Feedforward value, multiplied by the feedforward gain
    pub feedforward: f64,

    /// Speed used to schedule the gains
    ///
    /// Units: meters/second
    pub speed: f64,

    /// Errors with a magnitude below this are ignored
    pub deadzone: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PiController {

    /// Create a new controller with the given gains, running at `period_s`.
    ///
    /// The output limits default to +/- 1.
    pub fn new(k_p: GainSchedule, k_i: GainSchedule, k_f: f64, period_s: f64) -> Self {
        Self {
            k_p, k_i, k_f, period_s,
            pos_limit: 1.0,
            neg_limit: -1.0,
            p: 0.0,
            i: 0.0,
            f: 0.0,
            sat_count: 0.0,
            saturated: false,
            control: 0.0,
        }
    }

    /// Set the output limits.
    pub fn set_limits(&mut self, neg_limit: f64, pos_limit: f64) {
        self.neg_limit = neg_limit;
        self.pos_limit = pos_limit;
    }

    /// Reset the integrator and saturation state.
    pub fn reset(&mut self) {
        self.p = 0.0;
        self.i = 0.0;
        self.f = 0.0;
        self.sat_count = 0.0;
        self.saturated = false;
        self.control = 0.0;
    }

    /// Whether the controller has been saturated for long enough to be
    /// reported.
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    /// The integral accumulation.
    pub fn integral(&self) -> f64 {
        self.i
    }

    /// The last output of the controller.
    pub fn control(&self) -> f64 {
        self.control
    }

    /// Proportional gain at the given speed, before scaling.
    pub fn k_p(&self, speed: f64) -> f64 {
        interp(speed, &self.k_p.bp, &self.k_p.v)
    }

    /// Integral gain at the given speed, before scaling.
    pub fn k_i(&self, speed: f64) -> f64 {
        interp(speed, &self.k_i.bp, &self.k_i.v)
    }

    /// Feedforward gain, before scaling.
    pub fn k_f(&self) -> f64 {
        self.k_f
    }

    /// Update the controller, returning the bounded output.
    pub fn update(&mut self, input: &PiInput) -> f64 {
        let error = apply_deadzone(input.setpoint - input.measurement, input.deadzone);

        let k_p = self.k_p(input.speed) / input.ratio_factor * input.prob_factor;
        let k_i = self.k_i(input.speed) / input.ratio_factor * input.prob_factor;
        let k_f = self.k_f / input.ratio_factor;

        self.p = error * k_p;
        self.f = input.feedforward * k_f;

        if input.overriding {
            self.i -= I_UNWIND_RATE * self.period_s * sign(self.i);
        }
        else {
            let i = self.i + error * k_i * self.period_s;
            let control = self.p + self.f + i;

            // Only accept the new integral if it moves the output away from
            // the limit it's pushing against, or towards the sign of the error
            if (error >= 0.0 && (control <= self.pos_limit || i < 0.0))
                || (error <= 0.0 && (control >= self.neg_limit || i > 0.0))
            {
                self.i = i;
            }
        }

        let control = self.p + self.f + self.i;
        self.saturated = self.check_saturation(control, input.check_saturation, error);
        self.control = control.max(self.neg_limit).min(self.pos_limit);

        self.control
    }

    fn check_saturation(&mut self, control: f64, check_saturation: bool, error: f64) -> bool {
        let out_of_limits = control < self.neg_limit || control > self.pos_limit;

        if out_of_limits && check_saturation && error.abs() > SAT_MIN_ERROR {
            self.sat_count += self.period_s;
        }
        else {
            self.sat_count -= self.period_s;
        }

        self.sat_count = self.sat_count.max(0.0).min(1.0);

        self.sat_count > SAT_LIMIT
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Shrink the error towards zero by the deadzone.
fn apply_deadzone(error: f64, deadzone: f64) -> f64 {
    if error > deadzone {
        error - deadzone
    }
    else if error < -deadzone {
        error + deadzone
    }
    else {
        0.0
    }
}

/// Sign of the value, zero for zero.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    }
    else if value < 0.0 {
        -1.0
    }
    else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn controller(k_p: f64, k_i: f64, k_f: f64) -> PiController {
        PiController::new(
            GainSchedule { bp: vec![0.0], v: vec![k_p] },
            GainSchedule { bp: vec![0.0], v: vec![k_i] },
            k_f,
            0.01,
        )
    }

    fn input(setpoint: f64, measurement: f64) -> PiInput {
        PiInput {
            setpoint,
            measurement,
            ratio_factor: 1.0,
            prob_factor: 1.0,
            check_saturation: true,
            overriding: false,
            feedforward: 0.0,
            speed: 20.0,
            deadzone: 0.0,
        }
    }

    #[test]
    fn test_deadzone() {
        assert_eq!(apply_deadzone(0.5, 1.0), 0.0);
        assert_eq!(apply_deadzone(1.5, 1.0), 0.5);
        assert_eq!(apply_deadzone(-1.5, 1.0), -0.5);
        assert_eq!(apply_deadzone(-0.5, 0.0), -0.5);
    }

    #[test]
    fn test_proportional_and_integral() {
        let mut pi = controller(0.2, 0.5, 0.0);

        let out = pi.update(&input(1.0, 0.0));

        // p = 0.2, i = 0.5 * 0.01
        assert!((out - 0.205).abs() < 1e-12);
        assert!((pi.integral() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_gain_scaling() {
        let mut pi = controller(0.2, 0.0, 0.1);

        let mut inp = input(1.0, 0.0);
        inp.ratio_factor = 0.5;
        inp.prob_factor = 0.5;
        inp.feedforward = 2.0;

        // p = 1 * 0.2 / 0.5 * 0.5, f = 2 * 0.1 / 0.5
        let out = pi.update(&inp);
        assert!((out - 0.6).abs() < 1e-12);

        // A zero probability removes the feedback entirely
        inp.prob_factor = 0.0;
        inp.feedforward = 0.0;
        assert_eq!(pi.update(&inp), 0.0);
    }

    #[test]
    fn test_output_limits() {
        let mut pi = controller(10.0, 0.0, 0.0);
        pi.set_limits(-0.5, 0.5);

        assert_eq!(pi.update(&input(1.0, 0.0)), 0.5);
        assert_eq!(pi.update(&input(-1.0, 0.0)), -0.5);
    }

    #[test]
    fn test_anti_windup() {
        let mut pi = controller(10.0, 1.0, 0.0);
        pi.set_limits(-0.5, 0.5);

        // Pushing against the upper limit doesn't accumulate
        for _ in 0..100 {
            pi.update(&input(1.0, 0.0));
        }
        assert_eq!(pi.integral(), 0.0);
    }

    #[test]
    fn test_override_unwinds() {
        let mut pi = controller(0.0, 1.0, 0.0);

        for _ in 0..10 {
            pi.update(&input(1.0, 0.0));
        }
        let i_before = pi.integral();
        assert!(i_before > 0.0);

        let mut inp = input(1.0, 0.0);
        inp.overriding = true;
        pi.update(&inp);

        assert!((pi.integral() - (i_before - 0.003)).abs() < 1e-12);
    }

    #[test]
    fn test_saturation() {
        let mut pi = controller(10.0, 0.0, 0.0);
        pi.set_limits(-0.5, 0.5);

        // Needs more than 0.8 s of saturation at 100 Hz
        for _ in 0..70 {
            pi.update(&input(1.0, 0.0));
        }
        assert!(!pi.saturated());

        for _ in 0..20 {
            pi.update(&input(1.0, 0.0));
        }
        assert!(pi.saturated());

        // Not counted when the check is disabled
        let mut inp = input(1.0, 0.0);
        inp.check_saturation = false;
        for _ in 0..100 {
            pi.update(&inp);
        }
        assert!(!pi.saturated());

        // Reset clears everything
        pi.reset();
        assert!(!pi.saturated());
        assert_eq!(pi.control(), 0.0);
    }
}
