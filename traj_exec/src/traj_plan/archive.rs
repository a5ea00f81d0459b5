//! CSV archiving of planned trajectories

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use serde::Serialize;

use util::archive::{ArchiveError, Archived, Archiver};
use util::session::Session;

use super::Trajectory;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Writes a trajectory into the session archive as `traj/center.csv` and
/// `traj/wheels.csv`.
pub struct TrajArchive {
    traj: Arc<Trajectory>,
    center: Archiver,
    wheels: Archiver,
}

#[derive(Serialize)]
struct CenterRecord {
    index: usize,
    time_s: f64,
    x: f64,
    y: f64,
    heading_deg: f64,
    orig_speed: f64,
    speed: f64,
}

#[derive(Serialize)]
struct WheelRecord<'a> {
    index: usize,
    time_s: f64,
    wheel: &'a str,
    x: f64,
    y: f64,
    orig_speed: f64,
    speed: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajArchive {
    pub fn new(session: &Session, traj: Arc<Trajectory>) -> Result<Self, ArchiveError> {
        Ok(Self {
            traj,
            center: Archiver::from_path(session, "traj/center.csv")?,
            wheels: Archiver::from_path(session, "traj/wheels.csv")?,
        })
    }
}

impl Archived for TrajArchive {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let traj = &self.traj;
        let dt = traj.sample_time_s;

        for (i, point) in traj.center_path.points.iter().enumerate() {
            self.center.serialise(CenterRecord {
                index: i,
                time_s: i as f64 * dt,
                x: point.x(),
                y: point.y(),
                heading_deg: traj.heading.get(i).unwrap_or(std::f64::NAN),
                orig_speed: traj.center_orig_velocity.get(i).unwrap_or(std::f64::NAN),
                speed: traj.center_velocity.get(i).unwrap_or(std::f64::NAN),
            })?;
        }

        for wheel in traj.wheels.iter() {
            for (i, pos) in wheel.path.iter().enumerate() {
                self.wheels.serialise(WheelRecord {
                    index: i,
                    time_s: i as f64 * dt,
                    wheel: wheel.wheel.name(),
                    x: pos[0],
                    y: pos[1],
                    orig_speed: wheel.orig_velocity.get(i).unwrap_or(std::f64::NAN),
                    speed: wheel.velocity.get(i).unwrap_or(std::f64::NAN),
                })?;
            }
        }

        Ok(())
    }
}
