//! # Trajectory playback
//!
//! Playback steps through a planned trajectory one sample per period, sending
//! each wheel's velocity to its controller. The planned heading is compared
//! against a live heading measurement and the error is used to bias the left
//! and right wheels against each other.
//!
//! The module is split into:
//!
//! - [`Playback`] - the state machine, stepped once per call to `proc`.
//! - [`PlaybackExecutor`] - runs a `Playback` on its own thread at the
//!   trajectory's sample rate.
//!
//! Everything playback drives or reads is represented by a trait, so the same
//! code runs against real hardware or the simulated equipment in
//! [`crate::sim`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod executor;
mod heading;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use executor::PlaybackExecutor;
pub use heading::SharedHeading;
pub use params::PlaybackParams;
pub use state::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A closed loop velocity controller for one wheel.
pub trait VelocityController {
    /// Set the velocity the controller shall drive at, in the same units as
    /// the planned velocity profiles. Must not block.
    fn set_setpoint(&mut self, velocity: f64);
}

/// A source of the vehicle's measured heading.
pub trait HeadingSource {
    /// Current heading in degrees, or `None` if no measurement is available.
    fn heading_deg(&self) -> Option<f64>;
}

/// An action performed once the end of the trajectory has been reached, for
/// instance firing a shot.
pub trait EndAction {
    fn name(&self) -> &str;

    /// Called when playback starts.
    fn on_start(&mut self) {}

    /// Called once per playback period while the action runs. `elapsed_s` is
    /// the time since the action began.
    ///
    /// Returns `true` once the action has finished.
    fn run(&mut self, elapsed_s: f64) -> bool;

    /// Stop the action immediately. May be called when the action is not
    /// running.
    fn force_stop(&mut self);
}

/// An action fired when playback reaches a particular sample.
pub trait StepTrigger {
    fn name(&self) -> &str;

    fn fire(&mut self, timestep: usize);
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during playback.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Invalid playback parameters: {0}")]
    InvalidParams(String),

    #[error("Playback has not been initialised")]
    NotInitialised,

    #[error("No trajectory has been loaded")]
    NoTrajectory,

    #[error("Playback is already active")]
    AlreadyActive,

    #[error("Trajectory has {traj} wheels but {controllers} controllers were given")]
    ControllerCountMismatch { traj: usize, controllers: usize },

    #[error("End action timeout must be positive and finite, got {0}")]
    InvalidEndActionTimeout(f64),

    #[error("In end action mode with no end action set")]
    NoEndAction,

    #[error("The playback state lock was poisoned")]
    LockPoisoned,

    #[error("Could not spawn the playback thread: {0}")]
    SpawnError(std::io::Error),
}
