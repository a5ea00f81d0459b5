//! # Trajectory library.
//!
//! Plans time-parameterised trajectories through waypoints for differential and mecanum drive
//! bases, and plays them back against per-wheel velocity controllers with closed loop heading
//! correction.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Drive kinematics - converts a centre path into one path and speed profile per wheel
pub mod drive_kin;

/// Paths - waypoint sequences and the operations used to refine them
pub mod path;

/// Playback - steps through a trajectory writing wheel velocity setpoints
pub mod playback;

/// Routes - named trajectories loaded from parameter files
pub mod route;

/// Simulated equipment for running playback without hardware
pub mod sim;

/// Trajectory planner - turns waypoints into a smooth, timed trajectory
pub mod traj_plan;
