//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the lateral control software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Lane geometry supplied by the planner
pub mod plan;

/// Diagnostic telemetry records
pub mod tm;

/// Network module
pub mod net;
