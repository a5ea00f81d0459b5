//! # Trajectory planner
//!
//! The trajectory planner turns a sparse waypoint path into a dense,
//! time-indexed trajectory for a given drive geometry. Planning runs in the
//! following stages:
//!
//! 1. Reduce the path to its nodes (points where direction or heading change).
//! 2. Decide how many points to inject at each refinement stage so the dense
//!    path has as many samples as will fit in the requested duration.
//! 3. Inject and smooth the path once per stage.
//! 4. Calculate the wheel paths and raw wheel speeds.
//! 5. Smooth every velocity profile and correct it to cover the same distance.
//!
//! The result of a successful [`TrajPlanner::calculate`] replaces the
//! previous trajectory in one step. Readers holding the previous
//! [`Trajectory`] keep a valid copy.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod archive;
mod injection;
mod params;
mod velocity;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

// External
use log::{debug, error, info};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
pub use archive::TrajArchive;
pub use injection::{injection_counter, stage_points, InjectionPlan, NUM_STAGES};
pub use params::{PlannerOverrides, PlannerParams};
pub use velocity::{
    center_speeds, correct_velocity, velocity_fix, HeadingProfile, VelocityProfile,
};

use crate::drive_kin::{gradients_rad, headings_deg, DriveKinematics, KinError, Wheel};
use crate::path::{inject, node_only_waypoints, smooth, Path, PathError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory planner.
///
/// Owns the original waypoint path and the most recently calculated
/// trajectory.
#[derive(Debug)]
pub struct TrajPlanner {
    orig_path: Path,
    params: PlannerParams,
    trajectory: Option<Arc<Trajectory>>,
}

/// A fully planned trajectory.
#[derive(Clone, Debug, Serialize)]
pub struct Trajectory {
    /// Drive geometry the trajectory was planned for.
    pub drive: DriveKinematics,

    /// Requested duration.
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Time between samples.
    ///
    /// Units: seconds
    pub sample_time_s: f64,

    /// Injection counts used to build the dense path.
    pub injection: InjectionPlan,

    /// The reduced waypoint path.
    pub node_path: Path,

    /// The dense, smoothed center path, one point per sample.
    pub center_path: Path,

    /// Raw center speed from finite differences of the center path.
    pub center_orig_velocity: VelocityProfile,

    /// Corrected center speed.
    pub center_velocity: VelocityProfile,

    /// Heading at each sample.
    pub heading: HeadingProfile,

    /// Per-wheel paths and velocities, in the order of
    /// [`DriveKinematics::wheels`].
    pub wheels: Vec<WheelTrajectory>,
}

/// The path and velocities of a single wheel.
#[derive(Clone, Debug, Serialize)]
pub struct WheelTrajectory {
    pub wheel: Wheel,
    pub path: Vec<Vector2<f64>>,
    pub orig_velocity: VelocityProfile,
    pub velocity: VelocityProfile,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while planning a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    #[error("Sample time must be positive and finite, got {0}")]
    InvalidSampleTime(f64),

    #[error(
        "A duration of {duration_s} s at {sample_time_s} s per sample is too short for a path \
        with {num_nodes} nodes"
    )]
    DurationTooShort {
        duration_s: f64,
        sample_time_s: f64,
        num_nodes: usize,
    },

    #[error("Path error: {0}")]
    PathError(#[from] PathError),

    #[error("Drive kinematics error: {0}")]
    KinError(#[from] KinError),

    #[error(
        "Velocity distance fix did not converge after {iterations} iterations (residual {residual:e})"
    )]
    VelocityFixNotConverged { iterations: usize, residual: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajPlanner {
    /// Create a new planner for the given waypoint path.
    ///
    /// The path is checked when a trajectory is calculated, not here.
    pub fn new(orig_path: Path, params: PlannerParams) -> Self {
        Self {
            orig_path,
            params,
            trajectory: None,
        }
    }

    /// Calculate a new trajectory.
    ///
    /// On success the new trajectory replaces the previous one. On failure the
    /// error is logged and returned and the previous trajectory is kept.
    pub fn calculate(
        &mut self,
        duration_s: f64,
        sample_time_s: f64,
        drive: DriveKinematics,
    ) -> Result<(), PlanError> {
        match self.plan(duration_s, sample_time_s, drive) {
            Ok(traj) => {
                info!(
                    "Trajectory planned: {} nodes -> {} samples over {:.2} s",
                    traj.node_path.get_num_points(),
                    traj.num_final_points(),
                    traj.num_final_points() as f64 * sample_time_s
                );
                self.trajectory = Some(Arc::new(traj));
                Ok(())
            }
            Err(e) => {
                error!("Trajectory planning failed, keeping the previous trajectory: {}", e);
                Err(e)
            }
        }
    }

    /// The most recently calculated trajectory, if any.
    pub fn trajectory(&self) -> Option<Arc<Trajectory>> {
        self.trajectory.clone()
    }

    pub fn orig_path(&self) -> &Path {
        &self.orig_path
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    /// Replace the planner parameters. Takes effect at the next calculation.
    pub fn set_params(&mut self, params: PlannerParams) {
        self.params = params;
    }

    fn plan(
        &self,
        duration_s: f64,
        sample_time_s: f64,
        drive: DriveKinematics,
    ) -> Result<Trajectory, PlanError> {
        if !(duration_s.is_finite() && duration_s > 0.0) {
            return Err(PlanError::InvalidDuration(duration_s));
        }
        if !(sample_time_s.is_finite() && sample_time_s > 0.0) {
            return Err(PlanError::InvalidSampleTime(sample_time_s));
        }
        self.orig_path.validate()?;
        drive.validate()?;

        // ---- DENSE PATH ----

        let node_path = node_only_waypoints(&self.orig_path);
        let num_nodes = node_path.get_num_points();

        let injection = injection_counter(num_nodes, duration_s, sample_time_s).ok_or(
            PlanError::DurationTooShort {
                duration_s,
                sample_time_s,
                num_nodes,
            },
        )?;

        debug!(
            "Injection plan for {} nodes: {:?} -> {} points",
            num_nodes, injection.counts, injection.num_final_points
        );

        let mut center_path = node_path.clone();

        for (stage, count) in injection.counts.iter().enumerate() {
            let smoothing = match stage {
                0 => &self.params.path_smoothing,
                _ => &self.params.refine_smoothing,
            };

            center_path = inject(&center_path, *count);
            center_path = Path::new(smooth(&center_path.points, smoothing)?);

            debug!(
                "Stage {}: injected {}, path now {} points",
                stage,
                count,
                center_path.get_num_points()
            );
        }

        // ---- HEADING ----

        let positions = center_path.positions();
        let heading = HeadingProfile::new(sample_time_s, headings_deg(&gradients_rad(&positions)));

        // ---- VELOCITIES ----

        let center_orig_velocity =
            VelocityProfile::new(sample_time_s, center_speeds(&positions, sample_time_s));
        let center_velocity = self.correct(&center_orig_velocity)?;

        let wheels = drive
            .calc_wheel_paths(&center_path, sample_time_s)?
            .into_iter()
            .map(|wp| {
                let orig_velocity = VelocityProfile::new(sample_time_s, wp.speed);
                let velocity = self.correct(&orig_velocity)?;

                debug!(
                    "Wheel {}: distance {:.3}, peak speed {:.3}",
                    wp.wheel.name(),
                    velocity.distance(),
                    velocity.peak_speed()
                );

                Ok(WheelTrajectory {
                    wheel: wp.wheel,
                    path: wp.path,
                    orig_velocity,
                    velocity,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Ok(Trajectory {
            drive,
            duration_s,
            sample_time_s,
            injection,
            node_path,
            center_path,
            center_orig_velocity,
            center_velocity,
            heading,
            wheels,
        })
    }

    fn correct(&self, raw: &VelocityProfile) -> Result<VelocityProfile, PlanError> {
        correct_velocity(
            raw,
            &self.params.velocity_smoothing,
            self.params.velocity_fix_tolerance,
            self.params.velocity_fix_max_iterations,
        )
    }
}

impl Trajectory {
    /// Number of samples in the trajectory.
    pub fn num_final_points(&self) -> usize {
        self.center_path.get_num_points()
    }

    /// Get the trajectory of a particular wheel.
    pub fn wheel(&self, wheel: Wheel) -> Option<&WheelTrajectory> {
        self.wheels.iter().find(|w| w.wheel == wheel)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::Waypoint;

    const DIFF: DriveKinematics = DriveKinematics::Differential { track_width: 1.9 };

    fn straight_planner() -> TrajPlanner {
        TrajPlanner::new(
            Path::from_rows(&[[0.0, 0.0], [-15.0, 0.0]]).unwrap(),
            PlannerParams::default(),
        )
    }

    #[test]
    fn test_straight_line() {
        let mut planner = straight_planner();
        planner.calculate(5.0, 0.02, DIFF).unwrap();

        let traj = planner.trajectory().unwrap();

        assert_eq!(traj.num_final_points(), 246);
        assert_eq!(traj.heading.len(), 246);
        assert_eq!(traj.center_velocity.len(), 246);

        // Endpoints of the dense path are the node path endpoints
        assert_eq!(traj.center_path.first(), Some(&Waypoint::new(0.0, 0.0)));
        assert_eq!(traj.center_path.last(), Some(&Waypoint::new(-15.0, 0.0)));

        assert_eq!(traj.wheels.len(), 2);
        let left = traj.wheel(Wheel::Left).unwrap();
        let right = traj.wheel(Wheel::Right).unwrap();

        for w in [left, right].iter() {
            assert_eq!(w.velocity.len(), 246);
            assert_eq!(w.velocity.speed[0], 0.0);
            assert_eq!(w.velocity.speed[245], 0.0);
            assert!((w.velocity.distance() - 15.0).abs() < 1e-3);
            assert!((w.velocity.distance() - w.orig_velocity.distance()).abs() <= 1e-7);
            assert!(w.velocity.peak_speed() > 15.0 / 5.0);
        }

        for (l, r) in left.velocity.speed.iter().zip(right.velocity.speed.iter()) {
            assert!((l - r).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sharp_turn() {
        let mut planner = TrajPlanner::new(
            Path::from_rows(&[[0.0, 0.0], [4.0, 0.0], [0.0, 0.1]]).unwrap(),
            PlannerParams::default(),
        );
        planner.calculate(5.0, 0.02, DIFF).unwrap();

        let traj = planner.trajectory().unwrap();
        assert_eq!(traj.node_path.get_num_points(), 3);
        assert_eq!(traj.num_final_points(), 241);

        for w in traj.heading.heading_deg.windows(2) {
            assert!((w[1] - w[0]).abs() <= 180.0);
        }

        for w in traj.wheels.iter() {
            assert_eq!(w.velocity.speed[0], 0.0);
            assert_eq!(w.velocity.speed[240], 0.0);
            assert!((w.velocity.distance() - w.orig_velocity.distance()).abs() <= 1e-7);
        }
    }

    #[test]
    fn test_many_nodes() {
        // Zig-zag, every point is a node
        let rows: Vec<[f64; 2]> = (0..40).map(|i| [i as f64, (i % 2) as f64]).collect();
        let mut planner =
            TrajPlanner::new(Path::from_rows(&rows).unwrap(), PlannerParams::default());

        planner.calculate(5.0, 0.02, DIFF).unwrap();

        let traj = planner.trajectory().unwrap();
        assert_eq!(traj.node_path.get_num_points(), 40);
        assert_eq!(traj.injection.counts, [1, 2, 0]);
        assert_eq!(traj.num_final_points(), 235);

        for w in traj.wheels.iter() {
            assert_eq!(w.velocity.len(), 235);
            assert_eq!(w.velocity.speed[0], 0.0);
            assert_eq!(w.velocity.speed[234], 0.0);
        }
    }

    #[test]
    fn test_mecanum() {
        let mut planner = TrajPlanner::new(
            Path::from_rows(&[[0.0, 0.0, 0.0], [0.0, 6.0, 0.0], [4.0, 10.0, 45.0]]).unwrap(),
            PlannerParams::default(),
        );
        planner
            .calculate(
                4.0,
                0.02,
                DriveKinematics::Mecanum {
                    track_width: 2.0,
                    track_length: 2.5,
                },
            )
            .unwrap();

        let traj = planner.trajectory().unwrap();
        assert_eq!(traj.wheels.len(), 4);

        let n = traj.num_final_points();
        for w in traj.wheels.iter() {
            assert_eq!(w.path.len(), n);
            assert_eq!(w.velocity.speed[0], 0.0);
            assert_eq!(w.velocity.speed[n - 1], 0.0);
        }
    }

    #[test]
    fn test_failure_keeps_previous() {
        let mut planner = straight_planner();
        planner.calculate(5.0, 0.02, DIFF).unwrap();
        let before = planner.trajectory().unwrap();

        assert!(matches!(
            planner.calculate(5.0, 0.0, DIFF),
            Err(PlanError::InvalidSampleTime(_))
        ));
        assert!(matches!(
            planner.calculate(-1.0, 0.02, DIFF),
            Err(PlanError::InvalidDuration(_))
        ));
        assert!(matches!(
            planner.calculate(0.02, 0.02, DIFF),
            Err(PlanError::DurationTooShort { .. })
        ));
        assert!(matches!(
            planner.calculate(5.0, 0.02, DriveKinematics::Differential { track_width: 0.0 }),
            Err(PlanError::KinError(_))
        ));

        let after = planner.trajectory().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_invalid_path() {
        let mut planner = TrajPlanner::new(
            Path::from_rows(&[[0.0, 0.0]]).unwrap(),
            PlannerParams::default(),
        );

        assert!(matches!(
            planner.calculate(5.0, 0.02, DIFF),
            Err(PlanError::PathError(PathError::NotEnoughPoints(1)))
        ));
        assert!(planner.trajectory().is_none());
    }

    #[test]
    fn test_recalculate_replaces() {
        let mut planner = straight_planner();
        planner.calculate(5.0, 0.02, DIFF).unwrap();
        let first = planner.trajectory().unwrap();

        planner.calculate(1.0, 0.02, DIFF).unwrap();
        let second = planner.trajectory().unwrap();

        // The old trajectory is still intact for anyone holding it
        assert_eq!(first.num_final_points(), 246);
        assert_eq!(second.num_final_points(), 50);
    }
}
