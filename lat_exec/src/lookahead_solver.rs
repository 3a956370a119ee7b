//! # Lookahead trajectory solver
//!
//! A geometric trajectory solver which aims the vehicle at a point a speed dependent distance
//! ahead. The target lateral offset blends the lane centre (from the left and right lines) with
//! the predicted path, each weighted by its cost and visibility probability. A heading term pulls
//! the vehicle's heading towards the target line's tangent.
//!
//! The resulting road wheel angle is approached over the horizon with a first order response
//! whose time constant grows with the steer rate cost, so that a higher cost gives a gentler
//! target at the first step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::lat_ctrl::{
    CostWeights, SolveError, TrajectorySolution, TrajectorySolver, VehicleState
};
use comms_if::plan::LaneGeometry;
use util::maths::poly_val;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the lookahead solver, loaded from `lookahead_solver.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct LookaheadParams {
    /// Number of steps in the horizon, including the current state
    pub horizon_len: usize,

    /// Time between two steps of the horizon.
    ///
    /// Units: seconds
    pub step_s: f64,

    /// Time to the lookahead point.
    ///
    /// Units: seconds
    pub lookahead_time_s: f64,

    /// Minimum distance to the lookahead point.
    ///
    /// Units: meters
    pub min_lookahead_m: f64,

    /// Response time constant per unit of steer rate cost.
    ///
    /// Units: seconds
    pub tau_per_rate_cost_s: f64,
}

pub struct LookaheadSolver {
    params: LookaheadParams,

    /// Weights from the last call to `init`
    weights: Option<CostWeights>,

    /// Number of calls to `init`
    num_inits: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LookaheadParams {
    fn default() -> Self {
        Self {
            horizon_len: 20,
            step_s: 0.05,
            lookahead_time_s: 1.0,
            min_lookahead_m: 5.0,
            tau_per_rate_cost_s: 0.2,
        }
    }
}

impl LookaheadSolver {
    pub fn new(params: LookaheadParams) -> Self {
        Self {
            params,
            weights: None,
            num_inits: 0,
        }
    }

    /// Number of times the solver has been (re)initialised.
    pub fn num_inits(&self) -> u64 {
        self.num_inits
    }

    /// Lateral offset and heading of the target line at distance `x`.
    ///
    /// Returns `None` if no line has any weight.
    fn target_line(&self, weights: &CostWeights, geometry: &LaneGeometry, x: f64) -> Option<(f64, f64)> {
        let w_lane = weights.lane * 0.5 * (geometry.l_prob + geometry.r_prob);
        let w_path = weights.path * geometry.p_prob;
        let w_sum = w_lane + w_path;

        if !(w_sum > 0.0) {
            return None;
        }

        let centre = |x: f64| {
            0.5 * (poly_val(x, &geometry.l_poly) + poly_val(x, &geometry.r_poly))
        };
        let path = |x: f64| poly_val(x, &geometry.p_poly);

        let offset = (w_lane * centre(x) + w_path * path(x)) / w_sum;
        let slope = (w_lane * slope_at(x, &centre) + w_path * slope_at(x, &path)) / w_sum;

        Some((offset, slope.atan()))
    }
}

impl TrajectorySolver for LookaheadSolver {
    fn init(&mut self, weights: &CostWeights) {
        self.weights = Some(*weights);
        self.num_inits += 1;
    }

    fn solve(
        &mut self,
        state: &VehicleState,
        geometry: &LaneGeometry,
        curvature_factor: f64,
        v_ego: f64,
    ) -> Result<TrajectorySolution, SolveError> {
        let weights = self.weights.ok_or(SolveError::NotInitialised)?;

        if !(curvature_factor > 0.0) || self.params.horizon_len < 2 {
            return Err(SolveError::Infeasible);
        }

        let lookahead_m = (v_ego * self.params.lookahead_time_s).max(self.params.min_lookahead_m);

        // Lines are given relative to the vehicle at the time of measurement, while the state has
        // moved on by x
        let x = state.x + lookahead_m;
        let (target_y, target_heading) = match self.target_line(&weights, geometry, x) {
            Some(t) => t,
            None => return Err(SolveError::Infeasible),
        };

        // Offset of the target relative to where the vehicle is heading
        let rel_y = target_y - (state.y + state.psi * lookahead_m);

        let pursuit_curv = 2.0 * rel_y / lookahead_m.powi(2);
        let heading_curv = (target_heading - state.psi) / lookahead_m;

        let w_heading = weights.heading / (weights.heading + weights.lane + weights.path);
        let curv = pursuit_curv + w_heading * heading_curv;

        let target_delta = curv / curvature_factor;

        let tau_s = (weights.steer_rate * self.params.tau_per_rate_cost_s).max(self.params.step_s);

        let delta = (0..self.params.horizon_len)
            .map(|k| {
                let t = k as f64 * self.params.step_s;
                target_delta + (state.delta - target_delta) * (-t / tau_s).exp()
            })
            .collect();

        Ok(TrajectorySolution { delta })
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Central difference slope of `f` at `x`.
fn slope_at<F: Fn(f64) -> f64>(x: f64, f: &F) -> f64 {
    const H: f64 = 1e-3;
    (f(x + H) - f(x - H)) / (2.0 * H)
}
