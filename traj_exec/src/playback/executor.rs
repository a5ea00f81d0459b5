//! Periodic playback executor
//!
//! The executor owns a [`Playback`] behind a mutex and steps it from a
//! dedicated thread once per sample period. The playback thread is the only
//! thing which calls `proc`, and so the only writer of setpoints while
//! playback is active.
//!
//! Stopping takes the same lock as a tick, so a stop request either waits for
//! an in-flight tick to complete or runs before the next tick starts. Once the
//! state is `Stopped` a tick writes nothing, so no setpoint can be written
//! after [`PlaybackExecutor::stop_playback`] returns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// External
use log::{debug, error, info, warn};

// Internal
use super::*;
use crate::traj_plan::Trajectory;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs a [`Playback`] on its own thread at the trajectory's sample rate.
pub struct PlaybackExecutor {
    playback: Arc<Mutex<Playback>>,
    heading: Arc<dyn HeadingSource + Send + Sync>,
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlaybackExecutor {
    /// Create a new executor.
    ///
    /// `playback` must already be initialised. `heading` is read once per
    /// period, and may be updated from any other thread.
    pub fn new(playback: Playback, heading: Arc<dyn HeadingSource + Send + Sync>) -> Self {
        Self {
            playback: Arc::new(Mutex::new(playback)),
            heading,
            worker: None,
        }
    }

    /// Load a trajectory for the next playback.
    pub fn load_trajectory(&self, traj: Arc<Trajectory>, invert: bool) -> Result<(), PlaybackError> {
        self.lock()?.load_trajectory(traj, invert)
    }

    /// Set the action to run at the end of the trajectory.
    pub fn set_end_action(&self, end_action: Option<EndActionConfig>) -> Result<(), PlaybackError> {
        self.lock()?.set_end_action(end_action)
    }

    /// Add a trigger to fire when the given sample is played.
    pub fn add_step_trigger(
        &self,
        timestep: usize,
        trigger: Box<dyn StepTrigger + Send>,
    ) -> Result<(), PlaybackError> {
        self.lock()?.add_step_trigger(timestep, trigger)
    }

    /// Start playback of the loaded trajectory.
    ///
    /// The first sample is sent immediately, then one per sample period on the
    /// playback thread.
    pub fn start_playback(&mut self) -> Result<(), PlaybackError> {
        // Clean up any previous worker which has finished on its own. An
        // inactive playback is never ticked, so the worker has exited.
        if !self.is_playback_active() {
            self.join_worker();
        }

        let sample_time_s = {
            let mut playback = self.lock()?;
            playback.start()?;
            playback.sample_time_s().ok_or(PlaybackError::NoTrajectory)?
        };

        let (stop_tx, stop_rx) = mpsc::channel();
        let playback = self.playback.clone();
        let heading = self.heading.clone();
        let period = Duration::from_secs_f64(sample_time_s);

        let handle = thread::Builder::new()
            .name("playback".into())
            .spawn(move || {
                loop {
                    let tick_start = Instant::now();

                    if !tick(&playback, heading.as_ref()) {
                        break;
                    }

                    // Wait for the next period, or until asked to stop
                    let wait = match period.checked_sub(tick_start.elapsed()) {
                        Some(d) => d,
                        None => {
                            warn!(
                                "Playback tick overran by {:.06} s",
                                tick_start.elapsed().as_secs_f64() - period.as_secs_f64()
                            );
                            Duration::from_secs(0)
                        }
                    };

                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => (),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                debug!("Playback thread exiting");
            });

        let handle = match handle {
            Ok(h) => h,
            Err(e) => {
                // Don't leave the state machine running without a thread
                if let Ok(mut p) = self.playback.lock() {
                    p.stop();
                }
                return Err(PlaybackError::SpawnError(e));
            }
        };

        self.worker = Some(Worker { stop_tx, handle });

        Ok(())
    }

    /// Stop playback.
    ///
    /// Once this function returns all controllers have been set to zero, any
    /// end action has been stopped, and no further setpoints will be written.
    pub fn stop_playback(&mut self) {
        match self.playback.lock() {
            Ok(mut p) => p.stop(),
            Err(_) => error!("Playback lock poisoned, cannot zero the controllers"),
        }

        self.join_worker();
    }

    /// True while the trajectory or the end action is being played.
    pub fn is_playback_active(&self) -> bool {
        self.playback
            .lock()
            .map(|p| p.is_active())
            .unwrap_or(false)
    }

    /// The status report of the most recent period.
    pub fn last_report(&self) -> Option<StatusReport> {
        self.playback.lock().ok().map(|p| p.report().clone())
    }

    /// Block until playback finishes on its own or `timeout` elapses.
    ///
    /// Returns true if playback finished.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();

        while self.is_playback_active() {
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }

        self.join_worker();
        true
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            // The thread may have already exited, in which case the send fails
            worker.stop_tx.send(()).ok();
            if worker.handle.join().is_err() {
                error!("Playback thread panicked");
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Playback>, PlaybackError> {
        self.playback.lock().map_err(|_| PlaybackError::LockPoisoned)
    }
}

impl Drop for PlaybackExecutor {
    fn drop(&mut self) {
        self.stop_playback();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one playback period. Returns false once playback is no longer active.
fn tick(playback: &Mutex<Playback>, heading: &(dyn HeadingSource + Send + Sync)) -> bool {
    let mut playback = match playback.lock() {
        Ok(p) => p,
        Err(_) => {
            error!("Playback lock poisoned, stopping the playback thread");
            return false;
        }
    };

    // Stopped from outside since the last tick
    if !playback.is_active() {
        return false;
    }

    let input = PlaybackInput {
        heading_deg: heading.heading_deg(),
    };

    if let Err(e) = playback.proc(&input) {
        error!("Playback error, stopping: {}", e);
        playback.stop();
    }

    if !playback.is_active() {
        info!("Playback complete");
    }

    playback.is_active()
}
