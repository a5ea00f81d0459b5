//! Playback state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::drive_kin::Side;
use crate::traj_plan::{HeadingProfile, Trajectory};
use util::{maths::clamp, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory playback state machine.
///
/// `proc` shall be called once every sample period of the loaded trajectory.
pub struct Playback {
    params: Option<PlaybackParams>,

    /// Executing mode
    mode: PlaybackMode,

    /// Controllers in the same order as the trajectory's wheels.
    controllers: Vec<Box<dyn VelocityController + Send>>,

    traj: Option<Arc<Trajectory>>,

    /// Planned heading converted into the gyro frame.
    gyro_heading: Option<HeadingProfile>,

    /// If true every setpoint is negated, for trajectories driven backwards.
    invert: bool,

    /// Index of the next sample to play
    timestep: usize,

    end_action: Option<EndActionConfig>,

    /// Number of periods the end action has been running for
    end_action_ticks: usize,

    triggers: Vec<ArmedTrigger>,

    setpoints: Vec<f64>,
    report: StatusReport,
}

/// An end action and how long it is allowed to run for.
pub struct EndActionConfig {
    pub action: Box<dyn EndAction + Send>,

    /// Units: seconds
    pub timeout_s: f64,
}

struct ArmedTrigger {
    timestep: usize,
    trigger: Box<dyn StepTrigger + Send>,
    fired: bool,
}

/// Input data to playback.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaybackInput {
    /// Measured heading, if available.
    ///
    /// Units: degrees
    pub heading_deg: Option<f64>,
}

/// The status report of a single playback period.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StatusReport {
    /// Mode at the end of the period
    pub mode: PlaybackMode,

    /// The sample played in this period, if one was played.
    pub timestep: Option<usize>,

    /// Planned heading in the gyro frame for the played sample.
    pub planned_heading_deg: Option<f64>,

    /// Heading error used for correction, zero if no correction was applied.
    pub heading_error_deg: f64,

    /// The setpoints sent to the controllers this period.
    pub setpoints: Vec<f64>,

    /// True for each setpoint that was limited by `max_wheel_speed`.
    pub setpoint_limited: Vec<bool>,

    /// Time the end action has been running for.
    ///
    /// Units: seconds
    pub end_action_elapsed_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of playback. Each mode is handled by a `mode_xyz`
/// function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlaybackMode {
    /// No playback has been started yet.
    Idle,

    /// Stepping through the trajectory.
    Running,

    /// The trajectory is complete and the end action is running.
    EndAction,

    /// Playback finished or was stopped. Playback can be started again.
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PlaybackMode {
    fn default() -> Self {
        PlaybackMode::Idle
    }
}

impl State for Playback {
    type InitData = PlaybackParams;
    type InitError = PlaybackError;

    type InputData = PlaybackInput;
    type OutputData = Vec<f64>;
    type StatusReport = StatusReport;
    type ProcError = PlaybackError;

    /// Initialise playback with the given parameters.
    fn init(&mut self, params: PlaybackParams) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        params.validate()?;

        // Rebuild the gyro frame heading in case the offset changed
        self.gyro_heading = self
            .traj
            .as_ref()
            .map(|t| t.heading.to_gyro_frame(params.heading_offset_deg));
        self.params = Some(params);

        Ok(())
    }

    /// Process one playback period.
    ///
    /// The output data is the set of setpoints sent to the controllers in
    /// this period, which is empty if none were sent.
    fn proc(
        &mut self,
        input: &PlaybackInput,
    ) -> Result<(Vec<f64>, StatusReport), PlaybackError> {
        self.report = StatusReport::default();
        self.setpoints.clear();

        match self.mode {
            PlaybackMode::Idle | PlaybackMode::Stopped => (),
            PlaybackMode::Running => self.mode_running(input)?,
            PlaybackMode::EndAction => self.mode_end_action()?,
        }

        self.report.mode = self.mode;

        Ok((self.setpoints.clone(), self.report.clone()))
    }
}

impl Playback {
    /// Create a new playback driving the given controllers.
    ///
    /// The controllers must be in the same order as the wheels of the
    /// trajectories which will be loaded, see
    /// [`crate::drive_kin::DriveKinematics::wheels`].
    pub fn new(controllers: Vec<Box<dyn VelocityController + Send>>) -> Self {
        Self {
            params: None,
            mode: PlaybackMode::Idle,
            controllers,
            traj: None,
            gyro_heading: None,
            invert: false,
            timestep: 0,
            end_action: None,
            end_action_ticks: 0,
            triggers: Vec::new(),
            setpoints: Vec::new(),
            report: StatusReport::default(),
        }
    }

    /// Load a trajectory for the next playback.
    ///
    /// `invert` negates every setpoint, for trajectories which are driven
    /// backwards.
    pub fn load_trajectory(
        &mut self,
        traj: Arc<Trajectory>,
        invert: bool,
    ) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        if traj.wheels.len() != self.controllers.len() {
            return Err(PlaybackError::ControllerCountMismatch {
                traj: traj.wheels.len(),
                controllers: self.controllers.len(),
            });
        }

        let offset = self.params.map(|p| p.heading_offset_deg).unwrap_or(0.0);
        self.gyro_heading = Some(traj.heading.to_gyro_frame(offset));
        self.traj = Some(traj);
        self.invert = invert;

        Ok(())
    }

    /// Set the action to run once the end of the trajectory is reached.
    pub fn set_end_action(&mut self, end_action: Option<EndActionConfig>) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        if let Some(ref cfg) = end_action {
            if !(cfg.timeout_s.is_finite() && cfg.timeout_s > 0.0) {
                return Err(PlaybackError::InvalidEndActionTimeout(cfg.timeout_s));
            }
        }

        self.end_action = end_action;

        Ok(())
    }

    /// Add a trigger to fire when the given sample is played.
    pub fn add_step_trigger(
        &mut self,
        timestep: usize,
        trigger: Box<dyn StepTrigger + Send>,
    ) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        self.triggers.push(ArmedTrigger {
            timestep,
            trigger,
            fired: false,
        });

        Ok(())
    }

    /// Remove all step triggers.
    pub fn clear_step_triggers(&mut self) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        self.triggers.clear();

        Ok(())
    }

    /// Start playing the loaded trajectory from the first sample.
    ///
    /// The first sample is played on the next call to `proc`.
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        if self.params.is_none() {
            return Err(PlaybackError::NotInitialised);
        }

        if self.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        let num_points = match self.traj {
            Some(ref t) => t.num_final_points(),
            None => return Err(PlaybackError::NoTrajectory),
        };

        self.timestep = 0;
        self.end_action_ticks = 0;
        for t in self.triggers.iter_mut() {
            t.fired = false;
        }

        self.zero_controllers();

        if let Some(ref mut cfg) = self.end_action {
            cfg.action.on_start();
        }

        self.mode = PlaybackMode::Running;

        info!(
            "Playback started: {} samples{}",
            num_points,
            if self.invert { " (inverted)" } else { "" }
        );

        Ok(())
    }

    /// Stop playback immediately.
    ///
    /// All controllers are set to zero and any end action is stopped. Safe to
    /// call in any mode.
    pub fn stop(&mut self) {
        if self.is_active() {
            info!("Playback stopped at sample {}", self.timestep);
        }

        self.mode = PlaybackMode::Stopped;
        self.timestep = 0;
        self.end_action_ticks = 0;

        self.zero_controllers();

        if let Some(ref mut cfg) = self.end_action {
            cfg.action.force_stop();
        }
    }

    /// True while the trajectory or the end action is running.
    pub fn is_active(&self) -> bool {
        match self.mode {
            PlaybackMode::Running | PlaybackMode::EndAction => true,
            PlaybackMode::Idle | PlaybackMode::Stopped => false,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Index of the next sample to be played.
    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Sample period of the loaded trajectory.
    pub fn sample_time_s(&self) -> Option<f64> {
        self.traj.as_ref().map(|t| t.sample_time_s)
    }

    /// The report from the most recent call to `proc`.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Mode running.
    ///
    /// Plays one sample of the trajectory, or moves to the end action (or
    /// stops) once every sample has been played.
    fn mode_running(&mut self, input: &PlaybackInput) -> Result<(), PlaybackError> {
        let traj = match self.traj {
            Some(ref t) => t.clone(),
            None => return Err(PlaybackError::NoTrajectory),
        };
        let params = self.params.ok_or(PlaybackError::NotInitialised)?;

        // ---- COMPLETION ----

        if self.timestep >= traj.num_final_points() {
            self.zero_controllers();

            if self.end_action.is_some() {
                info!("Trajectory complete, starting end action");
                self.mode = PlaybackMode::EndAction;
                self.end_action_ticks = 0;
                return self.mode_end_action();
            } else {
                info!("Trajectory complete");
                self.stop();
                return Ok(());
            }
        }

        // ---- STEP TRIGGERS ----

        let timestep = self.timestep;
        for t in self.triggers.iter_mut() {
            if !t.fired && t.timestep == timestep {
                debug!("Firing step trigger {} at sample {}", t.trigger.name(), timestep);
                t.trigger.fire(timestep);
                t.fired = true;
            }
        }

        // ---- HEADING CORRECTION ----

        let planned = self.gyro_heading.as_ref().and_then(|h| h.get(timestep));

        let heading_error_deg = match (params.heading_correction_enabled, input.heading_deg, planned) {
            (true, Some(measured), Some(planned)) => measured * params.gyro_fudge_factor - planned,
            _ => 0.0,
        };
        let correction = heading_error_deg * params.heading_correction_gain;

        // ---- SETPOINTS ----

        let setpoints: Vec<f64> = traj
            .wheels
            .iter()
            .map(|w| {
                let v = w.velocity.get(timestep).unwrap_or(0.0);

                let v = match w.wheel.side() {
                    Side::Left => v + correction,
                    Side::Right => v - correction,
                };

                if self.invert {
                    -v
                } else {
                    v
                }
            })
            .collect();

        self.write_setpoints(setpoints, &params);

        trace!(
            "Sample {}: heading error {:.3} deg, setpoints {:?}",
            timestep,
            heading_error_deg,
            self.setpoints
        );

        self.report.timestep = Some(timestep);
        self.report.planned_heading_deg = planned;
        self.report.heading_error_deg = heading_error_deg;

        self.timestep += 1;

        Ok(())
    }

    /// Mode end action.
    ///
    /// Runs the end action once per period until it reports that it has
    /// finished or its timeout has elapsed.
    fn mode_end_action(&mut self) -> Result<(), PlaybackError> {
        let sample_time_s = self.sample_time_s().ok_or(PlaybackError::NoTrajectory)?;
        let elapsed_s = self.end_action_ticks as f64 * sample_time_s;

        let cfg = match self.end_action {
            Some(ref mut c) => c,
            None => return Err(PlaybackError::NoEndAction),
        };

        self.report.end_action_elapsed_s = Some(elapsed_s);

        if elapsed_s >= cfg.timeout_s {
            info!("End action {} timed out after {:.2} s", cfg.action.name(), elapsed_s);
            self.stop();
            return Ok(());
        }

        let finished = cfg.action.run(elapsed_s);
        self.end_action_ticks += 1;

        if finished {
            info!("End action {} finished after {:.2} s", cfg.action.name(), elapsed_s);
            self.stop();
        }

        Ok(())
    }

    /// Limit and send setpoints to the controllers.
    fn write_setpoints(&mut self, setpoints: Vec<f64>, params: &PlaybackParams) {
        self.report.setpoint_limited = vec![false; setpoints.len()];

        for (i, (ctrl, raw)) in self.controllers.iter_mut().zip(setpoints.iter()).enumerate() {
            let v = match params.max_wheel_speed {
                Some(max) => {
                    let limited = clamp(raw, &-max, &max);
                    if limited != *raw {
                        self.report.setpoint_limited[i] = true;
                    }
                    limited
                }
                None => *raw,
            };

            ctrl.set_setpoint(v);
            self.setpoints.push(v);
        }

        if self.report.setpoint_limited.iter().any(|l| *l) {
            warn!("Setpoints limited at sample {}: {:?}", self.timestep, self.setpoints);
        }

        self.report.setpoints = self.setpoints.clone();
    }

    fn zero_controllers(&mut self) {
        for ctrl in self.controllers.iter_mut() {
            ctrl.set_setpoint(0.0);
        }
    }
}
