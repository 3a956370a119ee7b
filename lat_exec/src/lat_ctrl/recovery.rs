//! Recovery from infeasible trajectory solutions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use std::fmt;

// Internal
use super::{CostWeights, SolveError, TrajectorySolution, TrajectorySolver, VehicleState};
use util::logger::Throttle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Watches solver results and restores the solver after a fault.
#[derive(Debug, Clone)]
pub struct RecoveryMonitor {
    /// Weights the solver is reinitialised with
    weights: CostWeights,

    /// Throttle on the fault warning
    throttle: Throttle,

    /// Total number of faults seen
    num_faults: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a solver result cannot be used.
#[derive(Debug, Clone, PartialEq)]
pub enum Infeasibility {
    /// The horizon contains a NaN or infinite value
    NonFinite,

    /// The horizon does not reach the target step
    ShortHorizon(usize),

    /// The solver reported an error
    Reported(SolveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infeasibility::NonFinite => write!(f, "non-finite value in the horizon"),
            Infeasibility::ShortHorizon(n) => write!(f, "horizon of {} steps is too short", n),
            Infeasibility::Reported(e) => write!(f, "{}", e),
        }
    }
}

impl RecoveryMonitor {
    /// Create a new monitor which will reinitialise solvers with `weights`,
    /// warning at most once every `warn_period_s`.
    pub fn new(weights: CostWeights, warn_period_s: f64) -> Self {
        Self {
            weights,
            throttle: Throttle::new(warn_period_s),
            num_faults: 0,
        }
    }

    /// Weights used to (re)initialise the solver.
    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    /// Total number of faults seen since creation.
    pub fn num_faults(&self) -> u64 {
        self.num_faults
    }

    /// Extract the target road wheel angle from a solver result.
    ///
    /// The whole horizon must be finite, not only the target step.
    pub fn assess(
        result: &Result<TrajectorySolution, SolveError>
    ) -> Result<f64, Infeasibility> {
        let solution = result.as_ref()
            .map_err(|e| Infeasibility::Reported(e.clone()))?;

        if !solution.is_finite() {
            return Err(Infeasibility::NonFinite);
        }

        solution.target_delta()
            .ok_or(Infeasibility::ShortHorizon(solution.delta.len()))
    }

    /// Recover from an unusable solver result.
    ///
    /// Reinitialises the solver with the configured weights and resets the
    /// state's road wheel angle to the one measured (`angle_steers_deg` over
    /// the effective `steer_ratio`). A warning is logged unless one was already
    /// logged within the warning period before `now_s`. Returns true if the
    /// warning was logged.
    pub fn recover<S: TrajectorySolver + ?Sized>(
        &mut self,
        cause: &Infeasibility,
        solver: &mut S,
        state: &mut VehicleState,
        angle_steers_deg: f64,
        steer_ratio: f64,
        now_s: f64,
    ) -> bool {
        self.num_faults += 1;

        solver.init(&self.weights);
        state.delta = angle_steers_deg.to_radians() / steer_ratio;

        if self.throttle.ready(now_s) {
            warn!(
                "Lateral solver - {} (solver reinitialised, {} faults so far)",
                cause, self.num_faults
            );
            true
        }
        else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::plan::LaneGeometry;

    struct CountingSolver {
        inits: Vec<CostWeights>,
    }

    impl TrajectorySolver for CountingSolver {
        fn init(&mut self, weights: &CostWeights) {
            self.inits.push(*weights);
        }

        fn solve(
            &mut self,
            _state: &VehicleState,
            _geometry: &LaneGeometry,
            _curvature_factor: f64,
            _v_ego: f64,
        ) -> Result<TrajectorySolution, SolveError> {
            Err(SolveError::Infeasible)
        }
    }

    fn weights() -> CostWeights {
        CostWeights { path: 1.0, lane: 3.0, heading: 1.0, steer_rate: 0.5 }
    }

    #[test]
    fn test_assess() {
        let ok = Ok(TrajectorySolution { delta: vec![0.0, 0.01] });
        assert_eq!(RecoveryMonitor::assess(&ok), Ok(0.01));

        let nan = Ok(TrajectorySolution { delta: vec![0.0, 0.01, f64::NAN] });
        assert_eq!(RecoveryMonitor::assess(&nan), Err(Infeasibility::NonFinite));

        let short = Ok(TrajectorySolution { delta: vec![0.0] });
        assert_eq!(RecoveryMonitor::assess(&short), Err(Infeasibility::ShortHorizon(1)));

        let err = Err(SolveError::Infeasible);
        assert_eq!(
            RecoveryMonitor::assess(&err),
            Err(Infeasibility::Reported(SolveError::Infeasible))
        );
    }

    #[test]
    fn test_recover() {
        let mut monitor = RecoveryMonitor::new(weights(), 5.0);
        let mut solver = CountingSolver { inits: vec![] };
        let mut state = VehicleState { delta: 0.3, ..Default::default() };

        let warned = monitor.recover(
            &Infeasibility::NonFinite, &mut solver, &mut state, 30.0, 15.0, 0.0
        );

        assert!(warned);
        assert_eq!(solver.inits, vec![weights()]);
        assert!((state.delta - 30f64.to_radians() / 15.0).abs() < 1e-12);
        assert_eq!(monitor.num_faults(), 1);
    }

    #[test]
    fn test_recover_warning_throttled() {
        let mut monitor = RecoveryMonitor::new(weights(), 5.0);
        let mut solver = CountingSolver { inits: vec![] };
        let mut state = VehicleState::default();

        // A fault every 50 ms for 12 s
        let mut num_warnings = 0;
        for i in 0..240 {
            let now_s = i as f64 / 20.0;
            if monitor.recover(
                &Infeasibility::NonFinite, &mut solver, &mut state, 0.0, 15.0, now_s
            ) {
                num_warnings += 1;
            }
        }

        // Every fault reinitialises, only 0, 5 and 10 s warn
        assert_eq!(solver.inits.len(), 240);
        assert_eq!(num_warnings, 3);
    }
}
