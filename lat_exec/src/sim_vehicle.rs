//! # Simulated vehicle
//!
//! A kinematic model of the vehicle driving along a lane, used to exercise lateral control in the
//! executable. The road has a constant curvature after a configurable start time, the speed is
//! constant, and the steering wheel turns at a rate proportional to the steering command.
//!
//! The lane geometry is expressed in the vehicle frame and published at a fraction of the control
//! rate, as the planner would.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use comms_if::plan::LaneGeometry;
use util::time::NANOS_PER_SECOND;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulation scenario, loaded from `sim.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Length of the run.
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Time at which lateral control is activated.
    ///
    /// Units: seconds
    pub engage_time_s: f64,

    /// Units: meters/second
    pub v_ego_ms: f64,

    /// Units: meters
    pub lane_width_m: f64,

    /// Curvature of the road once the curve has started, positive to the left.
    ///
    /// Units: 1/meters
    pub road_curvature_m: f64,

    /// Units: seconds
    pub curve_start_time_s: f64,

    /// Initial offset of the vehicle from the lane centre, positive to the left.
    ///
    /// Units: meters
    pub initial_offset_m: f64,

    /// Number of control cycles between two lane geometry updates
    pub geometry_period_cycles: u64,

    /// Steering wheel rate at full command.
    ///
    /// Units: degrees/second
    pub max_steer_rate_degs: f64,

    /// Every this many geometry updates one is published with non-finite
    /// polynomials. Zero disables the fault.
    pub nan_geometry_every: u64,
}

/// Simulated vehicle state.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    params: SimParams,

    /// Curvature factor of the vehicle at the simulated speed
    curvature_factor: f64,
    steer_ratio: f64,

    /// Units: seconds
    time_s: f64,

    /// Offset from the lane centre, positive to the left.
    ///
    /// Units: meters
    offset_m: f64,

    /// Heading relative to the lane, positive to the left.
    ///
    /// Units: radians
    heading_rad: f64,

    /// Units: degrees
    angle_steers_deg: f64,

    num_cycles: u64,
    num_geometries: u64,

    /// Last geometry published, and the cycle it was measured in
    geometry: Option<(u64, LaneGeometry)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimVehicle {
    /// Create a new simulation for a vehicle with the given curvature factor
    /// (at the simulated speed) and steer ratio.
    pub fn new(params: SimParams, curvature_factor: f64, steer_ratio: f64) -> Self {
        Self {
            offset_m: params.initial_offset_m,
            params,
            curvature_factor,
            steer_ratio,
            time_s: 0.0,
            heading_rad: 0.0,
            angle_steers_deg: 0.0,
            num_cycles: 0,
            num_geometries: 0,
            geometry: None,
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn v_ego(&self) -> f64 {
        self.params.v_ego_ms
    }

    pub fn angle_steers(&self) -> f64 {
        self.angle_steers_deg
    }

    pub fn offset_m(&self) -> f64 {
        self.offset_m
    }

    /// True once the run has lasted for the configured duration.
    pub fn finished(&self) -> bool {
        self.time_s >= self.params.duration_s
    }

    /// Whether lateral control should be active at the current time.
    pub fn active(&self) -> bool {
        self.time_s >= self.params.engage_time_s
    }

    /// The latest lane geometry, refreshed if one is due this cycle.
    pub fn geometry(&mut self) -> Option<LaneGeometry> {
        let period = self.params.geometry_period_cycles.max(1);

        let measured_this_cycle = matches!(self.geometry, Some((c, _)) if c == self.num_cycles);

        if self.num_cycles % period == 0 && !measured_this_cycle {
            self.num_geometries += 1;
            self.geometry = Some((self.num_cycles, self.measure_geometry()));
        }

        self.geometry.map(|(_, g)| g)
    }

    /// Advance the simulation by `dt_s` with the given steering command.
    pub fn step(&mut self, dt_s: f64, steer_cmd: f64) {
        let v = self.params.v_ego_ms;

        self.angle_steers_deg += steer_cmd * self.params.max_steer_rate_degs * dt_s;

        let delta = self.angle_steers_deg.to_radians() / self.steer_ratio;
        let yaw_rate = v * self.curvature_factor * delta - v * self.road_curvature();

        self.heading_rad += yaw_rate * dt_s;
        self.offset_m += v * self.heading_rad.sin() * dt_s;

        self.time_s += dt_s;
        self.num_cycles += 1;
    }

    fn road_curvature(&self) -> f64 {
        if self.time_s >= self.params.curve_start_time_s {
            self.params.road_curvature_m
        }
        else {
            0.0
        }
    }

    /// Lane lines as seen from the vehicle.
    ///
    /// Polynomials are highest power first in the forward distance.
    fn measure_geometry(&self) -> LaneGeometry {
        let half_width = 0.5 * self.params.lane_width_m;

        let mut centre = [
            0.0,
            0.5 * self.road_curvature(),
            -self.heading_rad,
            -self.offset_m,
        ];

        let nan_every = self.params.nan_geometry_every;
        if nan_every > 0 && self.num_geometries % nan_every == 0 {
            centre[3] = f64::NAN;
        }

        let mut l_poly = centre;
        l_poly[3] += half_width;
        let mut r_poly = centre;
        r_poly[3] -= half_width;

        // Timestamps start at one so the first geometry is always newer than
        // none at all
        let timestamp_ns = (self.time_s * NANOS_PER_SECOND as f64) as u64 + 1;

        LaneGeometry {
            timestamp_ns,
            l_poly,
            r_poly,
            p_poly: centre,
            c_poly: centre,
            d_poly: [centre[1], centre[2], centre[3]],
            l_prob: 1.0,
            r_prob: 1.0,
            p_prob: 1.0,
            c_prob: 1.0,
            lane_width: self.params.lane_width_m,
            lane_width_estimate: self.params.lane_width_m,
            lane_width_certainty: 1.0,
        }
    }
}
