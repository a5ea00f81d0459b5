//! # Simulated equipment
//!
//! Stand-ins for the wheel controllers, gyro, and mechanisms which playback
//! drives, so that routes can be played back without hardware.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// External
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

// Internal
use crate::drive_kin::Wheel;
use crate::playback::{EndAction, SharedHeading, StepTrigger, VelocityController};
use crate::traj_plan::HeadingProfile;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// History of the setpoints received by a simulated wheel. Clones share the
/// same history.
#[derive(Clone, Debug, Default)]
pub struct SetpointLog(Arc<Mutex<Vec<f64>>>);

/// A simulated wheel velocity controller which records its setpoints.
pub struct SimWheel {
    wheel: Wheel,
    log: SetpointLog,
}

/// Parameters of the simulated gyro.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimGyroParams {
    /// Period between heading updates.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// Heading drift rate added to the true heading.
    ///
    /// Units: degrees/second
    pub drift_deg_per_s: f64,

    /// Scale factor between the true heading and the reported one.
    pub scale: f64,

    /// If set, the gyro stops reporting a heading after this time.
    ///
    /// Units: seconds
    pub dropout_after_s: Option<f64>,
}

/// A simulated gyro which publishes a heading from its own thread.
///
/// The true heading follows a heading profile in real time, as though the
/// vehicle were tracking its trajectory perfectly.
pub struct SimGyro {
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

/// A simulated end of route mechanism, for instance a shooter. It never
/// reports finishing so runs until its timeout.
pub struct SimEndAction {
    name: String,
    running: bool,
}

/// A simulated mechanism operated at a particular sample, for instance an
/// intake arm.
pub struct SimStepTrigger {
    name: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SetpointLog {
    pub fn values(&self) -> Vec<f64> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.lock().ok().and_then(|v| v.last().copied())
    }

    fn push(&self, value: f64) {
        if let Ok(mut v) = self.0.lock() {
            v.push(value);
        }
    }
}

impl SimWheel {
    pub fn new(wheel: Wheel) -> Self {
        Self {
            wheel,
            log: SetpointLog::default(),
        }
    }

    pub fn log(&self) -> SetpointLog {
        self.log.clone()
    }
}

impl VelocityController for SimWheel {
    fn set_setpoint(&mut self, velocity: f64) {
        trace!("{} setpoint {:.4}", self.wheel.name(), velocity);
        self.log.push(velocity);
    }
}

impl Default for SimGyroParams {
    fn default() -> Self {
        Self {
            period_s: 0.01,
            drift_deg_per_s: 0.0,
            scale: 1.0,
            dropout_after_s: None,
        }
    }
}

impl SimGyro {
    /// Start publishing headings into `output`.
    pub fn spawn(
        output: SharedHeading,
        profile: HeadingProfile,
        params: SimGyroParams,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let period = Duration::from_secs_f64(params.period_s.max(1e-4));

        let handle = thread::Builder::new().name("sim_gyro".into()).spawn(move || {
            let start = Instant::now();

            loop {
                let t = start.elapsed().as_secs_f64();
                output.set(sim_heading(&profile, &params, t));

                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => (),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            debug!("Simulated gyro stopped");
        })?;

        Ok(Self {
            worker: Some((stop_tx, handle)),
        })
    }

    /// Stop the gyro thread.
    pub fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            stop_tx.send(()).ok();
            if handle.join().is_err() {
                warn!("Simulated gyro thread panicked");
            }
        }
    }
}

impl Drop for SimGyro {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SimEndAction {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            running: false,
        }
    }
}

impl EndAction for SimEndAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_start(&mut self) {
        debug!("{} armed", self.name);
    }

    fn run(&mut self, elapsed_s: f64) -> bool {
        if !self.running {
            info!("{} running", self.name);
            self.running = true;
        }
        trace!("{} at {:.2} s", self.name, elapsed_s);
        false
    }

    fn force_stop(&mut self) {
        if self.running {
            info!("{} stopped", self.name);
        }
        self.running = false;
    }
}

impl SimStepTrigger {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

impl StepTrigger for SimStepTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, timestep: usize) {
        info!("{} at sample {}", self.name, timestep);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The heading the simulated gyro reports at time `t` seconds.
fn sim_heading(profile: &HeadingProfile, params: &SimGyroParams, t: f64) -> Option<f64> {
    if let Some(d) = params.dropout_after_s {
        if t >= d {
            return None;
        }
    }

    if profile.is_empty() {
        return None;
    }

    let index = ((t / profile.sample_time_s) as usize).min(profile.len() - 1);
    let truth = profile.get(index)?;

    Some((truth + params.drift_deg_per_s * t) * params.scale)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::playback::HeadingSource;

    #[test]
    fn test_sim_heading() {
        let profile = HeadingProfile::new(1.0, vec![0.0, 10.0, 20.0]);
        let params = SimGyroParams {
            drift_deg_per_s: 1.0,
            scale: 2.0,
            dropout_after_s: Some(5.0),
            ..Default::default()
        };

        assert_eq!(sim_heading(&profile, &params, 0.0), Some(0.0));
        assert_eq!(sim_heading(&profile, &params, 1.5), Some(23.0));
        // Holds the last heading past the end of the profile
        assert_eq!(sim_heading(&profile, &params, 4.0), Some(48.0));
        assert_eq!(sim_heading(&profile, &params, 5.0), None);
    }

    #[test]
    fn test_sim_gyro_publishes() {
        let heading = SharedHeading::new();
        let mut gyro = SimGyro::spawn(
            heading.clone(),
            HeadingProfile::new(0.01, vec![7.0; 10]),
            SimGyroParams::default(),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert_eq!(heading.heading_deg(), Some(7.0));

        gyro.stop();
    }

    #[test]
    fn test_sim_wheel_log() {
        let mut wheel = SimWheel::new(Wheel::Left);
        let log = wheel.log();

        wheel.set_setpoint(1.0);
        wheel.set_setpoint(-2.0);

        assert_eq!(log.values(), vec![1.0, -2.0]);
        assert_eq!(log.last(), Some(-2.0));
    }
}
