//! # Lateral control library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the lateral control crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - global data for the executable's main loop
pub mod data_store;

/// Lateral control module - computes the steering command each cycle
pub mod lat_ctrl;

/// Lookahead solver - geometric trajectory solver used by the executable
pub mod lookahead_solver;

/// Simulated vehicle - kinematic vehicle and lane used to drive the executable
pub mod sim_vehicle;

/// Telemetry server - publishes steering records
pub mod tm_server;

/// Vehicle model - vehicle parameters and steering geometry
pub mod vehicle_model;
