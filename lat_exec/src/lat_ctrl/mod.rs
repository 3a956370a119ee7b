//! # Lateral control module
//!
//! Lateral control computes, once per control cycle, the steering command that keeps the vehicle
//! on the planned path.
//!
//! A trajectory solver is run at the planner's rate (about a fifth of the control rate) whenever
//! a new lane geometry arrives. Its input state is first projected forward by the actuator delay
//! so that the solution applies to the moment the command takes effect. The steering angle at a
//! short lookahead step of the solution becomes the held target angle.
//!
//! Every cycle the held target is pushed into a five slot smoothing buffer whose mean is the
//! desired angle. A PI controller then tracks the desired angle, with a feedforward term, and
//! its output is bounded by a speed dependent limit. Below a minimum speed, or when control is
//! not active, the command is zero and the controller is reset.
//!
//! Infeasible solutions, signalled either by non-finite values in the horizon or by the solver
//! returning an error, cause the solver to be reinitialised and a throttled warning to be
//! emitted. Control continues with the last good target.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod delay;
mod params;
mod recovery;
mod saturation;
mod smoother;
mod solver;
mod state;
mod steer_ratio;
mod telemetry;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use delay::*;
pub use params::Params;
pub use recovery::*;
pub use saturation::*;
pub use smoother::*;
pub use solver::*;
pub use state::*;
pub use steer_ratio::*;
pub use telemetry::*;
