//! # Data Store

use comms_if::plan::LaneGeometry;

use crate::lat_ctrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Planning
    /// Latest lane geometry received
    pub lane_geometry: Option<LaneGeometry>,

    // LatCtrl
    pub lat_ctrl_input: lat_ctrl::InputData,
    pub lat_ctrl_output: lat_ctrl::OutputData,
    pub lat_ctrl_status_rpt: lat_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Total number of solver faults
    pub num_solver_faults: u64,

    /// Number of cycles in which the controller reported saturation
    pub num_saturated_cycles: u64,

    /// Largest offset from the lane centre seen while active.
    ///
    /// Units: meters
    pub max_active_offset_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_second = (cycle_frequency_hz as u64).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_second == 0;

        self.lat_ctrl_input = lat_ctrl::InputData::default();
        self.lat_ctrl_output = lat_ctrl::OutputData::default();
        self.lat_ctrl_status_rpt = lat_ctrl::StatusReport::default();
    }

    /// Accumulate the monitoring counters from this cycle's lateral control
    /// results, then advance the cycle counter.
    pub fn cycle_end(&mut self, offset_m: f64) {
        if self.lat_ctrl_status_rpt.solver_fault {
            self.num_solver_faults += 1;
        }
        if self.lat_ctrl_output.saturated {
            self.num_saturated_cycles += 1;
        }
        if self.lat_ctrl_input.active {
            self.max_active_offset_m = self.max_active_offset_m.max(offset_m.abs());
        }

        self.num_cycles += 1;
    }
}
