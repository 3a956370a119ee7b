//! Lateral control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logger, parameters and modules
//!     - Main loop:
//!         - Lane geometry acquisition from the simulated planner
//!         - Lateral control processing
//!         - Simulated vehicle update
//!         - Archive writing
//!         - Cycle management
//!
//! Telemetry records are published by lateral control itself through the TmServer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::net::{zmq, NetParams};
use lat_lib::{
    data_store::DataStore,
    lat_ctrl::{self, LatCtrl},
    lookahead_solver::{LookaheadParams, LookaheadSolver},
    sim_vehicle::{SimParams, SimVehicle},
    tm_server::TmServer,
    vehicle_model::{CarParams, VehicleModel},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::{proc_infallible, State},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "lat_exec", about = "Lateral control against a simulated vehicle")]
struct Opts {
    /// Length of the run in seconds, overriding the simulation parameters
    #[structopt(short, long)]
    duration: Option<f64>,

    /// Do not start the telemetry server
    #[structopt(long)]
    no_tm: bool,

    /// Run cycles back to back instead of in real time
    #[structopt(long)]
    no_sleep: bool,

    /// Enable per-cycle trace logging
    #[structopt(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("lat_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    let log_level = if opts.verbose { LevelFilter::Trace } else { LevelFilter::Debug };
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Lateral Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let lat_ctrl_params: lat_ctrl::Params = util::params::load("lat_ctrl.toml")
        .wrap_err("Could not load lateral control params")?;
    let car_params: CarParams = util::params::load("vehicle.toml")
        .wrap_err("Could not load vehicle params")?;
    let solver_params: LookaheadParams = util::params::load("lookahead_solver.toml")
        .wrap_err("Could not load solver params")?;
    let mut sim_params: SimParams = util::params::load("sim.toml")
        .wrap_err("Could not load simulation params")?;
    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;

    if let Some(d) = opts.duration {
        sim_params.duration_s = d;
    }

    info!("Exec parameters loaded");

    let cycle_period_s = lat_ctrl_params.cycle_period_s;
    let cycle_frequency_hz = 1.0 / cycle_period_s;

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = zmq::Context::new();

    let tm_server = if opts.no_tm {
        info!("TmServer disabled");
        None
    }
    else {
        let s = TmServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise TmServer")?;
        info!("TmServer publishing on {}", net_params.tm_endpoint);
        Some(s)
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let vehicle = VehicleModel::new(car_params)
        .wrap_err("Invalid vehicle parameters")?;

    let mut sim = SimVehicle::new(
        sim_params.clone(),
        vehicle.curvature_factor(sim_params.v_ego_ms),
        vehicle.params().steer_ratio,
    );

    let mut lat_ctrl = LatCtrl::new(
        lat_ctrl_params,
        vehicle,
        LookaheadSolver::new(solver_params),
        tm_server,
    );
    lat_ctrl.init((), &session)
        .wrap_err("Failed to initialise LatCtrl")?;
    info!("LatCtrl init complete");

    let mut ds = DataStore::default();

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop ({:.1} s)\n", sim_params.duration_s);

    while !sim.finished() {

        let cycle_start_instant = Instant::now();

        ds.cycle_start(cycle_frequency_hz);
        ds.sim_time_s = sim.time_s();

        // ---- DATA INPUT ----

        if let Some(g) = sim.geometry() {
            ds.lane_geometry = Some(g);
        }

        ds.lat_ctrl_input = lat_ctrl::InputData {
            active: sim.active(),
            v_ego: sim.v_ego(),
            angle_steers: sim.angle_steers(),
            angle_offset: 0.0,
            steer_override: false,
            geometry: ds.lane_geometry,
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (output, report) = proc_infallible(&mut lat_ctrl, &ds.lat_ctrl_input);
        ds.lat_ctrl_output = output;
        ds.lat_ctrl_status_rpt = report;

        sim.step(cycle_period_s, ds.lat_ctrl_output.steer_cmd);

        // ---- WRITE ARCHIVES ----

        if let Err(e) = lat_ctrl.write() {
            warn!("Could not write LatCtrl archives: {}", e);
        }

        if ds.is_1_hz_cycle {
            info!(
                "t = {:.1} s: offset {:+.3} m, angle {:+.2} deg, desired {:+.2} deg, cmd {:+.3}",
                ds.sim_time_s,
                sim.offset_m(),
                sim.angle_steers(),
                ds.lat_ctrl_output.angle_steers_des,
                ds.lat_ctrl_output.steer_cmd
            );
        }

        ds.cycle_end(sim.offset_m());

        // ---- CYCLE MANAGEMENT ----

        if opts.no_sleep {
            continue;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    // ---- SHUTDOWN ----

    info!(
        "Ran {} cycles: {} solver faults, {} saturated cycles, max active offset {:.3} m",
        ds.num_cycles,
        ds.num_solver_faults,
        ds.num_saturated_cycles,
        ds.max_active_offset_m
    );
    if let Some(s) = lat_ctrl.sink() {
        info!(
            "{} telemetry records dropped, {} subscribers connected",
            s.num_dropped(),
            s.num_subscribers()
        );
    }

    info!("End of execution");

    Ok(())
}
