//! # Drive kinematics
//!
//! Converts a dense center path into the path followed by each wheel, and the
//! raw (unsmoothed) speed each wheel must be driven at to follow it.
//!
//! Two drive geometries are supported:
//!
//! - Differential, with one driven wheel (or track) either side of the center
//!   line, `track_width` apart. The body always faces the direction of travel.
//! - Mecanum, with four wheels at the corners of a `track_width` by
//!   `track_length` rectangle. The body faces the heading field of each
//!   waypoint, independent of the direction of travel.
//!
//! Body frame convention: +x to the right of the vehicle, +y forward.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_differential;
mod calc_mecanum;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::path::Path;
use util::maths::unwrap_deg;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset between the direction of travel and the heading reported in the
/// heading profile.
///
/// Units: degrees
pub const GRADIENT_TO_HEADING_OFFSET_DEG: f64 = 90.0;

/// Displacements shorter than this do not define a direction of travel.
const MIN_DISPLACEMENT: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The path and raw speed of a single wheel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WheelPath {
    pub wheel: Wheel,

    /// Position of the wheel contact point at each sample.
    pub path: Vec<Vector2<f64>>,

    /// Signed speed along the wheel's drive axis at each sample, with the
    /// first sample fixed at zero.
    ///
    /// Units: position units per second
    pub speed: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The geometry of the vehicle's drive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DriveKinematics {
    Differential {
        /// Lateral distance between the left and right wheels.
        track_width: f64,
    },
    Mecanum {
        /// Lateral distance between the left and right wheels.
        track_width: f64,

        /// Longitudinal distance between the front and rear wheels.
        track_length: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wheel {
    Left,
    Right,
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

/// Which side of the vehicle a wheel is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, thiserror::Error)]
pub enum KinError {
    #[error("Track width must be positive and finite, got {0}")]
    InvalidTrackWidth(f64),

    #[error("Track length must be positive and finite, got {0}")]
    InvalidTrackLength(f64),

    #[error("Sample time must be positive and finite, got {0}")]
    InvalidSampleTime(f64),

    #[error("Cannot compute wheel paths for a path with {0} points")]
    PathTooShort(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveKinematics {
    /// Check the geometry is usable.
    pub fn validate(&self) -> Result<(), KinError> {
        let track_width = match *self {
            DriveKinematics::Differential { track_width } => track_width,
            DriveKinematics::Mecanum {
                track_width,
                track_length,
            } => {
                if !(track_length.is_finite() && track_length > 0.0) {
                    return Err(KinError::InvalidTrackLength(track_length));
                }
                track_width
            }
        };

        if !(track_width.is_finite() && track_width > 0.0) {
            return Err(KinError::InvalidTrackWidth(track_width));
        }

        Ok(())
    }

    /// The wheels of this drive, in the order in which wheel paths are
    /// returned.
    pub fn wheels(&self) -> &'static [Wheel] {
        match self {
            DriveKinematics::Differential { .. } => &[Wheel::Left, Wheel::Right],
            DriveKinematics::Mecanum { .. } => &[
                Wheel::FrontLeft,
                Wheel::FrontRight,
                Wheel::RearLeft,
                Wheel::RearRight,
            ],
        }
    }

    /// Calculate the path and raw speed of every wheel for the given center
    /// path.
    pub fn calc_wheel_paths(
        &self,
        center: &Path,
        sample_time_s: f64,
    ) -> Result<Vec<WheelPath>, KinError> {
        self.validate()?;

        if !(sample_time_s.is_finite() && sample_time_s > 0.0) {
            return Err(KinError::InvalidSampleTime(sample_time_s));
        }

        if center.get_num_points() < 2 {
            return Err(KinError::PathTooShort(center.get_num_points()));
        }

        let wheel_paths = match *self {
            DriveKinematics::Differential { track_width } => {
                calc_differential::calc_differential(track_width, center, sample_time_s)
            }
            DriveKinematics::Mecanum {
                track_width,
                track_length,
            } => calc_mecanum::calc_mecanum(track_width, track_length, center, sample_time_s),
        };

        trace!(
            "Calculated {} wheel paths of {} points",
            wheel_paths.len(),
            center.get_num_points()
        );

        Ok(wheel_paths)
    }
}

impl Wheel {
    pub fn side(&self) -> Side {
        match self {
            Wheel::Left | Wheel::FrontLeft | Wheel::RearLeft => Side::Left,
            Wheel::Right | Wheel::FrontRight | Wheel::RearRight => Side::Right,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Wheel::Left => "left",
            Wheel::Right => "right",
            Wheel::FrontLeft => "front_left",
            Wheel::FrontRight => "front_right",
            Wheel::RearLeft => "rear_left",
            Wheel::RearRight => "rear_right",
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Direction of travel at each point of the path.
///
/// The gradient at point `i` is the direction from `i` to `i + 1`, with the
/// last point repeating the gradient before it. Where consecutive points
/// coincide the previous gradient is carried forward (or the next one back,
/// at the start of the path). A path with no motion at all has a gradient of
/// zero everywhere.
///
/// Units: radians
pub fn gradients_rad(points: &[Vector2<f64>]) -> Vec<f64> {
    if points.len() < 2 {
        return vec![0.0; points.len()];
    }

    let raw: Vec<Option<f64>> = points
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if d.norm() < MIN_DISPLACEMENT {
                None
            } else {
                Some(d[1].atan2(d[0]))
            }
        })
        .collect();

    let mut last = raw.iter().find_map(|g| *g).unwrap_or(0.0);
    let mut gradients = Vec::with_capacity(points.len());

    for g in raw {
        if let Some(g) = g {
            last = g;
        }
        gradients.push(last);
    }

    gradients.push(last);

    gradients
}

/// Continuous heading profile from a set of gradients.
///
/// Each heading is the gradient in degrees plus
/// [`GRADIENT_TO_HEADING_OFFSET_DEG`], unwrapped so that no two consecutive
/// headings differ by more than 180 degrees.
///
/// Units: degrees
pub fn headings_deg(gradients: &[f64]) -> Vec<f64> {
    let mut headings: Vec<f64> = Vec::with_capacity(gradients.len());

    for g in gradients {
        let raw = g.to_degrees() + GRADIENT_TO_HEADING_OFFSET_DEG;

        let heading = match headings.last() {
            Some(prev) => unwrap_deg(*prev, raw),
            None => raw,
        };

        headings.push(heading);
    }

    headings
}

/// Rotate a vector anticlockwise by `angle_rad`.
pub(crate) fn rotate(v: &Vector2<f64>, angle_rad: f64) -> Vector2<f64> {
    let (sin, cos) = angle_rad.sin_cos();
    Vector2::new(v[0] * cos - v[1] * sin, v[0] * sin + v[1] * cos)
}
