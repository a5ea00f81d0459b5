//! Main trajectory executable entry point.
//!
//! # Architecture
//!
//! A single run of the executable:
//!
//!     - Loads the executable, planner, and playback parameters, and a route
//!     - Plans the route's trajectory and archives it into the session
//!     - Plays the trajectory back against simulated wheel controllers, with a
//!       simulated gyro closing the heading loop
//!
//! Pass `--plan-only` to stop after planning.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use traj_lib::{
    drive_kin::DriveKinematics,
    playback::{
        EndActionConfig, HeadingSource, Playback, PlaybackExecutor, PlaybackParams,
        SharedHeading, VelocityController,
    },
    route::Route,
    sim::{SetpointLog, SimEndAction, SimGyro, SimGyroParams, SimStepTrigger, SimWheel},
    traj_plan::{InjectionPlan, PlannerParams, TrajArchive, TrajPlanner, Trajectory},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time allowed on top of the route and end action before playback is
/// considered stuck.
const PLAYBACK_TIMEOUT_MARGIN_S: f64 = 2.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plan and play back a route
#[derive(Debug, StructOpt)]
#[structopt(name = "traj_exec")]
struct Opt {
    /// Route file name within `params/routes`
    #[structopt(default_value = "cross_low_bar.toml")]
    route: String,

    /// Only plan and archive the trajectory, don't play it back
    #[structopt(long)]
    plan_only: bool,
}

/// Executable parameters, loaded from `traj_exec.toml`.
#[derive(Debug, Deserialize)]
struct ExecParams {
    drive: DriveKinematics,

    /// Units: seconds
    sample_time_s: f64,

    #[serde(default)]
    sim_gyro: SimGyroParams,
}

/// Summary of a planned trajectory, saved as JSON into the session.
#[derive(Debug, Serialize)]
struct PlanSummary<'a> {
    route: &'a str,
    drive: DriveKinematics,
    duration_s: f64,
    sample_time_s: f64,
    num_nodes: usize,
    injection: InjectionPlan,
    distance: f64,
    peak_speed: f64,
    wheel_peak_speeds: Vec<(&'static str, f64)>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("traj_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(
        LevelFilter::Debug,
        &[("traj_lib::playback", LevelFilter::Info)],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Trajectory Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    info!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load("traj_exec.toml").wrap_err("Could not load exec params")?;
    exec_params
        .drive
        .validate()
        .wrap_err("Invalid drive kinematics")?;

    let planner_params: PlannerParams =
        util::params::load("planner.toml").wrap_err("Could not load planner params")?;

    let playback_params: PlaybackParams =
        util::params::load("playback.toml").wrap_err("Could not load playback params")?;

    let route = Route::load(&opt.route).wrap_err("Could not load the route")?;

    info!("Parameters loaded, route \"{}\"", route.name);
    if !route.description.is_empty() {
        info!("    {}", route.description);
    }

    // ---- PLAN ----

    let mut planner = TrajPlanner::new(
        route.path().wrap_err("Invalid route path")?,
        route.planner_params(&planner_params),
    );

    planner
        .calculate(route.duration_s, exec_params.sample_time_s, exec_params.drive)
        .wrap_err("Failed to plan the trajectory")?;

    let traj = planner
        .trajectory()
        .ok_or_else(|| eyre!("Planner has no trajectory after calculating"))?;

    info!(
        "Trajectory planned: {} nodes, {} samples, {:.03} m",
        traj.node_path.get_num_points(),
        traj.num_final_points(),
        traj.center_velocity.distance()
    );

    session
        .save_json("traj/summary.json", &summarise(&route, &traj))
        .wrap_err("Failed to save the trajectory summary")?;

    TrajArchive::new(&session, traj.clone())
        .wrap_err("Failed to create the trajectory archive")?
        .write()
        .wrap_err("Failed to archive the trajectory")?;

    if opt.plan_only {
        info!("Plan only, exiting");
        return Ok(());
    }

    // ---- PLAYBACK ----

    let playback_params = route.playback_params(&playback_params);

    let wheels: Vec<SimWheel> = exec_params
        .drive
        .wheels()
        .iter()
        .map(|w| SimWheel::new(*w))
        .collect();
    let logs: Vec<SetpointLog> = wheels.iter().map(|w| w.log()).collect();
    let controllers: Vec<Box<dyn VelocityController + Send>> = wheels
        .into_iter()
        .map(|w| Box::new(w) as Box<dyn VelocityController + Send>)
        .collect();

    let mut playback = Playback::new(controllers);
    playback
        .init(playback_params)
        .wrap_err("Failed to initialise playback")?;

    let heading = SharedHeading::new();
    let mut gyro = SimGyro::spawn(
        heading.clone(),
        traj.heading.to_gyro_frame(playback_params.heading_offset_deg),
        SimGyroParams {
            scale: exec_params.sim_gyro.scale / playback_params.gyro_fudge_factor,
            ..exec_params.sim_gyro
        },
    )
    .wrap_err("Failed to start the simulated gyro")?;

    let heading_source: Arc<dyn HeadingSource + Send + Sync> = Arc::new(heading);
    let mut exec = PlaybackExecutor::new(playback, heading_source);

    exec.load_trajectory(traj.clone(), route.invert)
        .wrap_err("Failed to load the trajectory")?;

    let mut timeout_s = route.duration_s + PLAYBACK_TIMEOUT_MARGIN_S;

    if let Some(ref spec) = route.end_action {
        exec.set_end_action(Some(EndActionConfig {
            action: Box::new(SimEndAction::new(&spec.name)),
            timeout_s: spec.timeout_s,
        }))
        .wrap_err("Failed to set the end action")?;
        timeout_s += spec.timeout_s;
    }

    for trigger in route.step_triggers.iter() {
        exec.add_step_trigger(trigger.timestep, Box::new(SimStepTrigger::new(&trigger.name)))
            .wrap_err_with(|| format!("Failed to add step trigger {}", trigger.name))?;
    }

    exec.start_playback().wrap_err("Failed to start playback")?;
    info!("Playback started");

    if !exec.wait(Duration::from_secs_f64(timeout_s)) {
        warn!("Playback did not finish within {:.02} s, stopping", timeout_s);
    }

    exec.stop_playback();
    gyro.stop();

    if let Some(report) = exec.last_report() {
        info!("Final playback status: {:#?}", report);
    }

    for (wheel, log) in exec_params.drive.wheels().iter().zip(logs.iter()) {
        info!(
            "{} received {} setpoints, last {:?}",
            wheel.name(),
            log.values().len(),
            log.last()
        );
    }

    info!("End of execution");

    Ok(())
}

fn summarise<'a>(route: &'a Route, traj: &Trajectory) -> PlanSummary<'a> {
    PlanSummary {
        route: &route.name,
        drive: traj.drive,
        duration_s: traj.duration_s,
        sample_time_s: traj.sample_time_s,
        num_nodes: traj.node_path.get_num_points(),
        injection: traj.injection,
        distance: traj.center_velocity.distance(),
        peak_speed: traj.center_velocity.peak_speed(),
        wheel_peak_speeds: traj
            .wheels
            .iter()
            .map(|w| (w.wheel.name(), w.velocity.peak_speed()))
            .collect(),
    }
}
