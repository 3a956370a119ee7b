//! Trajectory solver interface
//!
//! Lateral control does not depend on a particular optimiser. Any solver which
//! implements [`TrajectorySolver`] can be injected. Solvers may report an
//! infeasible problem either by returning [`SolveError`] or by returning a
//! horizon containing non-finite values; both are handled by the recovery
//! monitor.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::VehicleState;
use comms_if::plan::LaneGeometry;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Index in the solution horizon of the steering angle used as the target.
pub const TARGET_INDEX: usize = 1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cost weights used to configure a trajectory solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostWeights {
    pub path: f64,
    pub lane: f64,
    pub heading: f64,
    pub steer_rate: f64,
}

/// A solution returned by a trajectory solver.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySolution {
    /// Road wheel angle at each step of the horizon, starting at the current
    /// state.
    ///
    /// Units: radians
    pub delta: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors reported by a trajectory solver.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("the problem is infeasible")]
    Infeasible,

    #[error("the solver did not converge after {0} iterations")]
    NotConverged(usize),

    #[error("the solver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A short horizon trajectory optimiser.
///
/// Calls are synchronous and must complete within the control period.
pub trait TrajectorySolver {
    /// (Re)configure the solver. Takes effect on the next call to `solve`, and
    /// may be called at any time.
    fn init(&mut self, weights: &CostWeights);

    /// Solve for the steering trajectory from the given state.
    ///
    /// `v_ego` is already clamped to the minimum solver speed.
    fn solve(
        &mut self,
        state: &VehicleState,
        geometry: &LaneGeometry,
        curvature_factor: f64,
        v_ego: f64,
    ) -> Result<TrajectorySolution, SolveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectorySolution {
    /// Returns true if every value in the horizon is finite.
    pub fn is_finite(&self) -> bool {
        self.delta.iter().all(|d| d.is_finite())
    }

    /// The target road wheel angle, or `None` if the horizon is too short.
    pub fn target_delta(&self) -> Option<f64> {
        self.delta.get(TARGET_INDEX).copied()
    }
}

impl<S: TrajectorySolver + ?Sized> TrajectorySolver for Box<S> {
    fn init(&mut self, weights: &CostWeights) {
        (**self).init(weights)
    }

    fn solve(
        &mut self,
        state: &VehicleState,
        geometry: &LaneGeometry,
        curvature_factor: f64,
        v_ego: f64,
    ) -> Result<TrajectorySolution, SolveError> {
        (**self).solve(state, geometry, curvature_factor, v_ego)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_solution_checks() {
        let sol = TrajectorySolution { delta: vec![0.0, 0.02, 0.03] };
        assert!(sol.is_finite());
        assert_eq!(sol.target_delta(), Some(0.02));

        let sol = TrajectorySolution { delta: vec![0.0, 0.02, f64::NAN] };
        assert!(!sol.is_finite());

        let sol = TrajectorySolution { delta: vec![0.0] };
        assert_eq!(sol.target_delta(), None);
    }
}
