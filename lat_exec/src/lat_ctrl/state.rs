//! Lateral control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::convert::Infallible;

// Internal
use super::*;
use crate::vehicle_model::{SteerControlType, VehicleModel};
use comms_if::{plan::LaneGeometry, tm::SteerRecord};
use util::{
    archive::{Archived, ArchiveError, Archiver},
    logger::Throttle,
    module::State,
    session::Session,
    time::unix_timestamp_nanos,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Lateral control module.
///
/// Generic over the trajectory solver and the telemetry sink, which are both
/// supplied at construction.
pub struct LatCtrl<S: TrajectorySolver, T: TelemetrySink> {
    params: Params,
    vehicle: VehicleModel,

    solver: S,
    sink: T,

    recovery: RecoveryMonitor,
    pi: PiController,
    smoother: AngleSmoother,

    /// State given to the solver, carried between updates
    state: VehicleState,

    /// Timestamp of the last geometry the solver was run on
    last_geometry_ts: u64,

    /// Road wheel angle selected at the last solver update
    delta_desired: f64,

    /// Desired steering angle held between solver updates.
    ///
    /// Units: degrees
    held_angle_steers_des: f64,

    /// Smoothed desired steering angle.
    ///
    /// Units: degrees
    angle_steers_des: f64,

    /// Mean of the left and right lane probabilities at the last update
    prob_factor: f64,

    /// Record waiting to be published on the next cycle without an update
    pending_record: Option<SteerRecord>,

    /// Logical cycle counter
    tick: u64,

    /// Throttle on invalid input warnings
    input_warn: Throttle,

    report: StatusReport,
    output: OutputData,

    report_archiver: Archiver,
    output_archiver: Archiver,
}

/// Input data to lateral control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Whether the supervisor requests steering control
    pub active: bool,

    /// Vehicle speed
    ///
    /// Units: meters/second
    pub v_ego: f64,

    /// Measured steering wheel angle
    ///
    /// Units: degrees
    pub angle_steers: f64,

    /// Steering angle sensor offset
    ///
    /// Units: degrees
    pub angle_offset: f64,

    /// Whether the driver is overriding the steering
    pub steer_override: bool,

    /// Latest lane geometry from the planner, if any has been received.
    ///
    /// The solver only runs when its timestamp is newer than the last one
    /// used, so the same geometry may be given on every cycle.
    pub geometry: Option<LaneGeometry>,
}

/// Output of lateral control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputData {
    /// Bounded steering command
    pub steer_cmd: f64,

    /// Smoothed desired steering angle
    ///
    /// Units: degrees
    pub angle_steers_des: f64,

    /// Whether the controller is saturated
    pub saturated: bool,
}

/// Status of one control cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub tick: u64,
    pub engagement: Engagement,

    /// True if the solver ran this cycle
    pub solver_updated: bool,

    /// True if the solver result could not be used
    pub solver_fault: bool,

    /// True if a fault warning was logged this cycle
    pub fault_warned: bool,

    /// True if a pending telemetry record was published this cycle
    pub telemetry_published: bool,

    pub ratio_factor: f64,
    pub steer_ratio: f64,
    pub prob_factor: f64,

    /// Units: degrees
    pub held_angle_steers_des: f64,

    /// Integral accumulation of the PI controller
    pub integral: f64,

    pub state_x: f64,
    pub state_psi: f64,
    pub state_delta: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LatCtrlInitError {
    #[error("Could not create the archive: {0}")]
    ArchiveError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: TrajectorySolver, T: TelemetrySink> State for LatCtrl<S, T> {
    type InitData = ();
    type InitError = LatCtrlInitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Attach the module's archives to the session.
    fn init(&mut self, _init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.report_archiver = Archiver::from_path(session, "lat_ctrl/status_report.csv")
            .map_err(LatCtrlInitError::ArchiveError)?;
        self.output_archiver = Archiver::from_path(session, "lat_ctrl/output.csv")
            .map_err(LatCtrlInitError::ArchiveError)?;

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let output = self.step(input_data);
        Ok((output, self.report))
    }
}

impl<S: TrajectorySolver, T: TelemetrySink> Archived for LatCtrl<S, T> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.report_archiver.serialise(self.report)?;
        self.output_archiver.serialise(self.output)?;

        Ok(())
    }
}

impl<S: TrajectorySolver, T: TelemetrySink> LatCtrl<S, T> {
    /// Create a new lateral control module.
    ///
    /// The solver is initialised with the cost weights from the parameters and
    /// the vehicle's steer rate cost.
    pub fn new(params: Params, vehicle: VehicleModel, mut solver: S, sink: T) -> Self {
        let cp = vehicle.params();

        let weights = CostWeights {
            path: params.path_cost,
            lane: params.lane_cost,
            heading: params.heading_cost,
            steer_rate: cp.steer_rate_cost,
        };
        solver.init(&weights);

        let pi = PiController::new(
            GainSchedule { bp: cp.steer_kp_bp.clone(), v: cp.steer_kp_v.clone() },
            GainSchedule { bp: cp.steer_ki_bp.clone(), v: cp.steer_ki_v.clone() },
            cp.steer_kf,
            params.cycle_period_s,
        );

        Self {
            recovery: RecoveryMonitor::new(weights, params.warn_period_s),
            input_warn: Throttle::new(params.warn_period_s),
            params,
            vehicle,
            solver,
            sink,
            pi,
            smoother: AngleSmoother::new(),
            state: VehicleState::default(),
            last_geometry_ts: 0,
            delta_desired: 0.0,
            held_angle_steers_des: 0.0,
            angle_steers_des: 0.0,
            prob_factor: 0.0,
            pending_record: None,
            tick: 0,
            report: StatusReport::default(),
            output: OutputData::default(),
            report_archiver: Archiver::default(),
            output_archiver: Archiver::default(),
        }
    }

    /// Reset the feedback controller's integrator and saturation state.
    pub fn reset(&mut self) {
        self.pi.reset();
    }

    /// Run one control cycle.
    pub fn step(&mut self, input: &InputData) -> OutputData {
        self.report = StatusReport {
            tick: self.tick,
            ..Default::default()
        };

        let engagement = Engagement::assess(
            input.active,
            input.v_ego,
            input.angle_steers,
            input.angle_offset,
            self.params.min_active_speed_ms,
        );
        self.report.engagement = engagement;

        // Nothing derived from the measurements can be trusted if they are
        // not finite, so solver updates wait for a valid cycle.
        let inputs_valid = engagement != Engagement::InvalidInput;

        let ratio_factor = if inputs_valid { ratio_factor(input.angle_steers) } else { 1.0 };
        let steer_ratio = self.vehicle.params().steer_ratio * ratio_factor;
        self.report.ratio_factor = ratio_factor;
        self.report.steer_ratio = steer_ratio;

        match input.geometry {
            Some(ref g) if inputs_valid && g.is_newer_than(self.last_geometry_ts) => {
                self.update_solver(input, g, ratio_factor, steer_ratio);
            },
            _ => self.publish_pending(),
        }

        let steer_cmd = if engagement.is_engaged() {
            self.angle_steers_des = self.smoother.inject(self.tick, self.held_angle_steers_des);

            let (neg, pos) = output_limits(self.vehicle.steer_max(input.v_ego));
            self.pi.set_limits(neg, pos);

            let mut feedforward = self.angle_steers_des;
            if self.vehicle.params().steer_control_type == SteerControlType::Torque {
                feedforward *= input.v_ego.powi(2);
            }

            self.pi.update(&PiInput {
                setpoint: self.angle_steers_des,
                measurement: input.angle_steers,
                ratio_factor,
                prob_factor: self.prob_factor,
                check_saturation: input.v_ego > self.params.sat_check_min_speed_ms,
                overriding: input.steer_override,
                feedforward,
                speed: input.v_ego,
                deadzone: self.params.deadzone_deg,
            })
        }
        else {
            if engagement == Engagement::InvalidInput
                && self.input_warn.ready(self.loop_time_s())
            {
                warn!(
                    "Lateral control - non-finite input (v_ego: {}, angle_steers: {}, \
                    angle_offset: {}), commanding zero",
                    input.v_ego, input.angle_steers, input.angle_offset
                );
            }

            self.pi.reset();
            self.smoother.zero(self.tick);
            0.0
        };

        self.output = OutputData {
            steer_cmd,
            angle_steers_des: self.angle_steers_des,
            saturated: self.pi.saturated(),
        };

        self.report.prob_factor = self.prob_factor;
        self.report.held_angle_steers_des = self.held_angle_steers_des;
        self.report.integral = self.pi.integral();
        self.report.state_x = self.state.x;
        self.report.state_psi = self.state.psi;
        self.report.state_delta = self.state.delta;

        trace!(
            "Lateral control tick {}: {:?}, cmd {:.4}, des {:.3} deg",
            self.tick, engagement, steer_cmd, self.angle_steers_des
        );

        self.tick += 1;

        self.output
    }

    /// Run the solver on a new lane geometry and refresh the held target.
    fn update_solver(
        &mut self,
        input: &InputData,
        geometry: &LaneGeometry,
        ratio_factor: f64,
        steer_ratio: f64,
    ) {
        self.last_geometry_ts = geometry.timestamp_ns;
        self.report.solver_updated = true;

        let cp = self.vehicle.params();
        let curvature_factor = self.vehicle.curvature_factor(input.v_ego);

        self.state = states_after_delay(
            self.state,
            input.v_ego,
            input.angle_steers,
            curvature_factor,
            steer_ratio,
            cp.steer_actuator_delay_s,
        );

        let v_solver = input.v_ego.max(self.params.min_solver_speed_ms);
        let result = self.solver.solve(&self.state, geometry, curvature_factor, v_solver);
        self.prob_factor = (geometry.l_prob + geometry.r_prob) / 2.0;

        let assessed = RecoveryMonitor::assess(&result);

        // When not active the target follows the measured angle so that
        // engaging starts from where the wheel already is
        let delta_desired = if input.active {
            assessed.as_ref().ok().copied()
        }
        else {
            Some((input.angle_steers - input.angle_offset).to_radians() / steer_ratio)
        };

        if let Some(delta) = delta_desired {
            self.delta_desired = delta;
            self.state.delta = delta;
            self.held_angle_steers_des = (delta * steer_ratio).to_degrees() + input.angle_offset;
        }

        if let Err(cause) = assessed {
            self.report.solver_fault = true;
            let now_s = self.loop_time_s();
            self.report.fault_warned = self.recovery.recover(
                &cause,
                &mut self.solver,
                &mut self.state,
                input.angle_steers,
                steer_ratio,
                now_s,
            );
        }

        debug!(
            "Lateral solver update at {} ns: delta {:.5} rad, target {:.3} deg{}",
            geometry.timestamp_ns,
            self.delta_desired,
            self.held_angle_steers_des,
            if self.report.solver_fault { " (fault)" } else { "" }
        );

        let cp = self.vehicle.params();
        self.pending_record = Some(SteerRecord {
            active: input.active,
            delta_desired: self.delta_desired,
            angle_offset: input.angle_offset,
            angle_steers_des: self.held_angle_steers_des,
            steer_ratio,
            scaled_kf: cp.steer_kf / ratio_factor,
            scaled_kp: cp.steer_kp_v[0] / ratio_factor,
            scaled_ki: cp.steer_ki_v[0] / ratio_factor,
            steer_rate_cost: cp.steer_rate_cost,
            l_prob: geometry.l_prob,
            r_prob: geometry.r_prob,
            c_prob: geometry.c_prob,
            p_prob: geometry.p_prob,
            l_poly: geometry.l_poly,
            r_poly: geometry.r_poly,
            p_poly: geometry.p_poly,
            c_poly: geometry.c_poly,
            d_poly: geometry.d_poly,
            lane_width: geometry.lane_width,
            lane_width_estimate: geometry.lane_width_estimate,
            lane_width_certainty: geometry.lane_width_certainty,
            v_ego: input.v_ego,
            timestamp_ns: unix_timestamp_nanos(),
        });
    }

    /// Publish the record of the last solver update, if it hasn't been yet.
    fn publish_pending(&mut self) {
        if let Some(record) = self.pending_record.take() {
            self.report.telemetry_published = true;

            if let Err(e) = self.sink.publish(&record) {
                warn!("Could not publish steering telemetry: {}", e);
            }
        }
    }

    /// Time since the first cycle, counted in control periods.
    fn loop_time_s(&self) -> f64 {
        self.tick as f64 * self.params.cycle_period_s
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn vehicle(&self) -> &VehicleModel {
        &self.vehicle
    }

    pub fn vehicle_state(&self) -> &VehicleState {
        &self.state
    }

    pub fn prob_factor(&self) -> f64 {
        self.prob_factor
    }

    /// Desired steering angle held since the last solver update.
    pub fn held_angle_steers_des(&self) -> f64 {
        self.held_angle_steers_des
    }

    pub fn smoother(&self) -> &AngleSmoother {
        &self.smoother
    }

    pub fn controller(&self) -> &PiController {
        &self.pi
    }

    pub fn recovery(&self) -> &RecoveryMonitor {
        &self.recovery
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle_model::test::test_params;
    use comms_if::tm::ANGLE_STEERS_DES_FIELD;

    /// Solver which returns a fixed response and records its calls.
    struct FakeSolver {
        response: Result<TrajectorySolution, SolveError>,
        inits: Vec<CostWeights>,
        solves: usize,
        last_v: f64,
    }

    impl FakeSolver {
        fn returning(delta: Vec<f64>) -> Self {
            Self {
                response: Ok(TrajectorySolution { delta }),
                inits: vec![],
                solves: 0,
                last_v: 0.0,
            }
        }
    }

    impl TrajectorySolver for FakeSolver {
        fn init(&mut self, weights: &CostWeights) {
            self.inits.push(*weights);
        }

        fn solve(
            &mut self,
            _state: &VehicleState,
            _geometry: &LaneGeometry,
            _curvature_factor: f64,
            v_ego: f64,
        ) -> Result<TrajectorySolution, SolveError> {
            self.solves += 1;
            self.last_v = v_ego;
            self.response.clone()
        }
    }

    type TestCtrl = LatCtrl<FakeSolver, RecordingSink>;

    fn lat_ctrl(solver: FakeSolver) -> TestCtrl {
        let vehicle = VehicleModel::new(test_params()).unwrap();
        LatCtrl::new(Params::default(), vehicle, solver, RecordingSink::default())
    }

    fn torque_lat_ctrl(solver: FakeSolver) -> TestCtrl {
        let mut cp = test_params();
        cp.steer_control_type = SteerControlType::Torque;
        let vehicle = VehicleModel::new(cp).unwrap();
        LatCtrl::new(Params::default(), vehicle, solver, RecordingSink::default())
    }

    fn input(v_ego: f64, angle_steers: f64, ts: u64) -> InputData {
        InputData {
            active: true,
            v_ego,
            angle_steers,
            angle_offset: 0.0,
            steer_override: false,
            geometry: Some(LaneGeometry::straight(ts, 3.7)),
        }
    }

    fn expected_weights() -> CostWeights {
        CostWeights { path: 1.0, lane: 3.0, heading: 1.0, steer_rate: 0.5 }
    }

    #[test]
    fn test_solver_initialised_on_creation() {
        let ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.0]));

        assert_eq!(ctrl.solver().inits, vec![expected_weights()]);
        assert_eq!(ctrl.recovery().weights(), &expected_weights());
    }

    #[test]
    fn test_inactive_outputs_zero() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        // Build up a target and an integral
        for i in 0..20 {
            ctrl.step(&input(20.0, 0.0, 1 + i / 5));
        }
        assert!(ctrl.controller().integral() != 0.0);

        let tick = ctrl.tick();
        let mut inp = input(20.0, 0.0, 100);
        inp.active = false;
        let out = ctrl.step(&inp);

        assert_eq!(out.steer_cmd, 0.0);
        assert!(!out.saturated);
        assert_eq!(ctrl.controller().integral(), 0.0);
        assert_eq!(ctrl.smoother().steps()[AngleSmoother::slot(tick)], 0.0);

        // Other slots are untouched
        assert!(ctrl.smoother().mean() > 0.0);
    }

    #[test]
    fn test_below_min_speed_outputs_zero() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        for i in 0..10 {
            ctrl.step(&input(20.0, 0.0, 1 + i));
        }

        let tick = ctrl.tick();
        let out = ctrl.step(&input(0.29, 0.0, 50));

        assert_eq!(out.steer_cmd, 0.0);
        assert_eq!(ctrl.controller().integral(), 0.0);
        assert_eq!(ctrl.smoother().steps()[AngleSmoother::slot(tick)], 0.0);
        assert_eq!(ctrl.report().engagement, Engagement::BelowMinSpeed);
    }

    #[test]
    fn test_solver_runs_on_newer_geometry_only() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.0]));

        // A zero timestamp is never newer than the initial one
        ctrl.step(&input(20.0, 0.0, 0));
        assert_eq!(ctrl.solver().solves, 0);

        ctrl.step(&input(20.0, 0.0, 10));
        ctrl.step(&input(20.0, 0.0, 10));
        assert_eq!(ctrl.solver().solves, 1);

        ctrl.step(&input(20.0, 0.0, 5));
        assert_eq!(ctrl.solver().solves, 1);

        ctrl.step(&input(20.0, 0.0, 11));
        assert_eq!(ctrl.solver().solves, 2);

        let mut inp = input(20.0, 0.0, 12);
        inp.geometry = None;
        ctrl.step(&inp);
        assert_eq!(ctrl.solver().solves, 2);
    }

    #[test]
    fn test_solver_speed_clamped() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.0]));

        ctrl.step(&input(2.0, 0.0, 1));
        assert_eq!(ctrl.solver().last_v, 5.0);

        ctrl.step(&input(12.0, 0.0, 2));
        assert_eq!(ctrl.solver().last_v, 12.0);
    }

    #[test]
    fn test_prob_factor_updated_with_solver() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.0]));
        assert_eq!(ctrl.prob_factor(), 0.0);

        let mut inp = input(20.0, 0.0, 1);
        if let Some(ref mut g) = inp.geometry {
            g.l_prob = 0.9;
            g.r_prob = 0.5;
        }
        ctrl.step(&inp);
        assert!((ctrl.prob_factor() - 0.7).abs() < 1e-12);

        // Same geometry with other probabilities isn't a new update
        if let Some(ref mut g) = inp.geometry {
            g.l_prob = 0.0;
        }
        ctrl.step(&inp);
        assert!((ctrl.prob_factor() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_nan_horizon_recovers() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02, 0.03]));

        ctrl.step(&input(20.0, 5.0, 1));
        let held = ctrl.held_angle_steers_des();
        let delta_ok = (held.to_radians()) / effective_steer_ratio(15.0, 5.0);
        assert!((delta_ok - 0.02).abs() < 1e-12);

        ctrl.solver.response = Ok(TrajectorySolution { delta: vec![0.0, 0.02, f64::NAN] });
        let out = ctrl.step(&input(20.0, 5.0, 2));

        // Reinitialised with the original weights
        assert_eq!(ctrl.solver().inits, vec![expected_weights(); 2]);

        // Delta reset to the measured angle
        let expected_delta = 5f64.to_radians() / effective_steer_ratio(15.0, 5.0);
        assert!((ctrl.vehicle_state().delta - expected_delta).abs() < 1e-12);

        // Last good target kept, output finite
        assert_eq!(ctrl.held_angle_steers_des(), held);
        assert!(out.steer_cmd.is_finite());
        assert!(ctrl.report().solver_fault);
        assert!(ctrl.report().fault_warned);
    }

    #[test]
    fn test_reported_infeasibility_recovers() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));
        ctrl.step(&input(20.0, 0.0, 1));

        ctrl.solver.response = Err(SolveError::Infeasible);
        ctrl.step(&input(20.0, 0.0, 2));
        assert!(ctrl.report().solver_fault);
        assert_eq!(ctrl.solver().inits.len(), 2);

        ctrl.solver.response = Ok(TrajectorySolution { delta: vec![0.0] });
        ctrl.step(&input(20.0, 0.0, 3));
        assert!(ctrl.report().solver_fault);
        assert_eq!(ctrl.solver().inits.len(), 3);

        assert!(ctrl.held_angle_steers_des().is_finite());
    }

    #[test]
    fn test_fault_warning_throttled() {
        let mut solver = FakeSolver::returning(vec![]);
        solver.response = Ok(TrajectorySolution { delta: vec![f64::NAN; 20] });
        let mut ctrl = lat_ctrl(solver);

        // 12 s at 100 Hz with new geometry every 5 cycles
        let mut num_faults = 0;
        let mut num_warnings = 0;
        for i in 0..1200u64 {
            ctrl.step(&input(20.0, 0.0, 1 + i / 5));
            if ctrl.report().solver_fault {
                num_faults += 1;
            }
            if ctrl.report().fault_warned {
                num_warnings += 1;
            }
        }

        assert_eq!(num_faults, 240);
        assert_eq!(num_warnings, 3);
        assert_eq!(ctrl.solver().inits.len(), 241);
    }

    #[test]
    fn test_smoothing_after_update() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        let mut des = vec![];
        for _ in 0..8 {
            des.push(ctrl.step(&input(20.0, 0.0, 1)).angle_steers_des);
        }

        let held = ctrl.held_angle_steers_des();
        for k in 0..5 {
            assert!((des[k] - held * (k + 1) as f64 / 5.0).abs() < 1e-9);
        }

        // Constant once settled
        assert_eq!(des[5], des[6]);
        assert_eq!(des[6], des[7]);
        assert!((des[7] - held).abs() < 1e-9);
    }

    #[test]
    fn test_output_bounded_by_steer_max() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.3]));

        for i in 0..200 {
            let out = ctrl.step(&input(20.0, -200.0, 1 + i / 5));
            assert!(out.steer_cmd.abs() <= 0.75);
        }

        for i in 0..200 {
            let out = ctrl.step(&input(40.0, 150.0, 100 + i / 5));
            assert!(out.steer_cmd.abs() <= 0.5);
        }
    }

    #[test]
    fn test_straight_road_settles_to_zero() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0; 20]));

        let mut outputs = vec![];
        for i in 0..10 {
            outputs.push(ctrl.step(&input(20.0, 0.0, 1 + i / 5)).steer_cmd);
        }

        for out in &outputs[5..] {
            assert_eq!(out.abs(), 0.0);
        }
    }

    #[test]
    fn test_telemetry_published_next_cycle() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        ctrl.step(&input(20.0, 0.0, 1));
        assert!(ctrl.sink().records.is_empty());

        ctrl.step(&input(20.0, 0.0, 1));
        assert_eq!(ctrl.sink().records.len(), 1);
        assert!(ctrl.report().telemetry_published);

        let record = ctrl.sink().records[0];
        assert!((record.angle_steers_des - 17.188733853924695).abs() < 1e-9);
        assert_eq!(record.steer_ratio, 15.0);

        let line = record.to_string();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields[0], "1");
        assert_eq!(fields[ANGLE_STEERS_DES_FIELD], "17.188734");

        // Only published once
        ctrl.step(&input(20.0, 0.0, 1));
        assert_eq!(ctrl.sink().records.len(), 1);
    }

    #[test]
    fn test_telemetry_superseded_by_consecutive_update() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        ctrl.step(&input(20.0, 0.0, 1));
        ctrl.step(&input(21.0, 0.0, 2));
        ctrl.step(&input(22.0, 0.0, 2));

        assert_eq!(ctrl.sink().records.len(), 1);
        assert_eq!(ctrl.sink().records[0].v_ego, 21.0);
    }

    #[test]
    fn test_inactive_update_follows_measured_angle() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        let mut inp = input(20.0, 10.0, 1);
        inp.active = false;
        inp.angle_offset = 2.0;
        ctrl.step(&inp);

        let ratio = effective_steer_ratio(15.0, 10.0);
        assert!((ctrl.vehicle_state().delta - 8f64.to_radians() / ratio).abs() < 1e-12);
        assert!((ctrl.held_angle_steers_des() - 10.0).abs() < 1e-9);

        inp.geometry = None;
        ctrl.step(&inp);
        assert!(!ctrl.sink().records[0].active);
    }

    #[test]
    fn test_invalid_input_outputs_zero() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        let out = ctrl.step(&input(f64::NAN, 0.0, 1));
        assert_eq!(out.steer_cmd, 0.0);
        assert_eq!(ctrl.report().engagement, Engagement::InvalidInput);
        assert_eq!(ctrl.solver().solves, 0);

        // The geometry is consumed once inputs are valid again
        ctrl.step(&input(20.0, 0.0, 1));
        assert_eq!(ctrl.solver().solves, 1);
    }

    #[test]
    fn test_feedforward_by_control_type() {
        // With no lane confidence the P and I terms vanish, leaving the
        // feedforward alone in the command
        let mut geometry = LaneGeometry::straight(1, 3.7);
        geometry.l_prob = 0.0;
        geometry.r_prob = 0.0;
        let mut inp = input(20.0, 10.0, 1);
        inp.geometry = Some(geometry);

        let mut torque = torque_lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));
        let out = torque.step(&inp);
        let rf = torque.report().ratio_factor;

        assert_eq!(torque.prob_factor(), 0.0);
        assert_eq!(torque.controller().integral(), 0.0);
        assert!(out.angle_steers_des > 0.0);
        let expected = torque.controller().k_f() / rf * 20f64.powi(2) * out.angle_steers_des;
        assert!((out.steer_cmd - expected).abs() < 1e-12);

        // An angle actuator gets the desired angle without the speed scaling
        let mut angle = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));
        let out = angle.step(&inp);
        let expected = angle.controller().k_f() / rf * out.angle_steers_des;
        assert!((out.steer_cmd - expected).abs() < 1e-12);
    }

    #[test]
    fn test_saturation_only_checked_above_min_speed() {
        // A target far beyond the command limit keeps the controller pinned
        // against it for 1.5 s
        let mut slow = lat_ctrl(FakeSolver::returning(vec![0.0, 0.3]));
        for i in 0..150 {
            let out = slow.step(&input(9.9, 0.0, 1 + i / 5));
            assert_eq!(out.steer_cmd, 1.0);
            assert!(!out.saturated);
        }

        let mut fast = lat_ctrl(FakeSolver::returning(vec![0.0, 0.3]));
        let mut outputs = vec![];
        for i in 0..150 {
            outputs.push(fast.step(&input(20.0, 0.0, 1 + i / 5)));
        }

        assert!(outputs.iter().all(|o| o.steer_cmd == 0.75));
        assert!(!outputs[70].saturated);
        assert!(outputs[149].saturated);
        assert!(fast.controller().saturated());
    }

    #[test]
    fn test_steer_override_unwinds_integral() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));
        for i in 0..20 {
            ctrl.step(&input(20.0, 0.0, 1 + i / 5));
        }
        let integral = ctrl.controller().integral();
        assert!(integral > 0.0);

        let mut inp = input(20.0, 0.0, 4);
        inp.steer_override = true;
        ctrl.step(&inp);

        // Unwound at 0.3 per second instead of accumulating the error
        assert!((ctrl.controller().integral() - (integral - 0.3 * 0.01)).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));
        for i in 0..20 {
            ctrl.step(&input(20.0, 0.0, 1 + i / 5));
        }
        assert!(ctrl.controller().integral() != 0.0);

        ctrl.reset();

        assert_eq!(ctrl.controller().integral(), 0.0);
        assert!(!ctrl.controller().saturated());
    }

    #[test]
    fn test_deterministic() {
        let inputs: Vec<InputData> = (0..300u64)
            .map(|i| {
                let mut inp = input(5.0 + i as f64 * 0.1, (i as f64 * 0.05).sin() * 20.0, 1 + i / 5);
                inp.steer_override = i % 50 == 0;
                inp.active = i % 97 != 0;
                inp
            })
            .collect();

        let run = || {
            let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.01, 0.02]));
            inputs.iter()
                .map(|i| ctrl.step(i))
                .map(|o| (o.steer_cmd.to_bits(), o.angle_steers_des.to_bits(), o.saturated))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_proc() {
        let mut ctrl = lat_ctrl(FakeSolver::returning(vec![0.0, 0.02]));

        let (out, report) = State::proc(&mut ctrl, &input(20.0, 0.0, 1)).unwrap();

        assert!(report.solver_updated);
        assert_eq!(report.tick, 0);
        assert_eq!(out, ctrl.output);
        assert!(ctrl.write().is_ok());
    }
}
