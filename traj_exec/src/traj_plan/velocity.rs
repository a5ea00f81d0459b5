//! # Velocity and heading profiles
//!
//! A velocity profile is the speed to drive at for each sample of the dense
//! path. Raw profiles come straight from finite differences of the path. The
//! corrected profile is a smoothed copy of the raw one which starts and ends
//! at zero and has been adjusted so that it covers the same distance.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::PlanError;
use crate::path::{smooth, SmoothParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the distance error removed from each interior sample on every
/// iteration of the distance fix.
const VELOCITY_FIX_STEP_DIVISOR: f64 = 50.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Speed at each sample of a trajectory.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VelocityProfile {
    /// Time between consecutive samples.
    ///
    /// Units: seconds
    pub sample_time_s: f64,

    /// Signed speed at each sample, negative meaning reverse.
    ///
    /// Units: position units per second
    pub speed: Vec<f64>,
}

/// Heading at each sample of a trajectory.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeadingProfile {
    /// Time between consecutive samples.
    ///
    /// Units: seconds
    pub sample_time_s: f64,

    /// Continuous (unwrapped) heading at each sample.
    ///
    /// Units: degrees
    pub heading_deg: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityProfile {
    pub fn new(sample_time_s: f64, speed: Vec<f64>) -> Self {
        Self {
            sample_time_s,
            speed,
        }
    }

    pub fn len(&self) -> usize {
        self.speed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speed.is_empty()
    }

    /// Get the speed at the given sample
    pub fn get(&self, index: usize) -> Option<f64> {
        self.speed.get(index).copied()
    }

    /// Iterate over `(time_s, speed)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let dt = self.sample_time_s;
        self.speed
            .iter()
            .enumerate()
            .map(move |(i, s)| (i as f64 * dt, *s))
    }

    /// Running distance travelled at each sample.
    pub fn cumulative_distance(&self) -> Vec<f64> {
        cumulative_distance(&self.speed, self.sample_time_s)
    }

    /// Total distance travelled over the whole profile.
    pub fn distance(&self) -> f64 {
        self.cumulative_distance().last().copied().unwrap_or(0.0)
    }

    /// Largest absolute speed in the profile.
    pub fn peak_speed(&self) -> f64 {
        self.speed.iter().fold(0.0, |m, s| s.abs().max(m))
    }
}

impl HeadingProfile {
    pub fn new(sample_time_s: f64, heading_deg: Vec<f64>) -> Self {
        Self {
            sample_time_s,
            heading_deg,
        }
    }

    pub fn len(&self) -> usize {
        self.heading_deg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heading_deg.is_empty()
    }

    /// Get the heading at the given sample
    pub fn get(&self, index: usize) -> Option<f64> {
        self.heading_deg.get(index).copied()
    }

    /// Iterate over `(time_s, heading_deg)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let dt = self.sample_time_s;
        self.heading_deg
            .iter()
            .enumerate()
            .map(move |(i, h)| (i as f64 * dt, *h))
    }

    /// Convert the profile into the gyro's frame of reference, in which the
    /// heading is `offset_deg` less than the path heading.
    pub fn to_gyro_frame(&self, offset_deg: f64) -> HeadingProfile {
        HeadingProfile {
            sample_time_s: self.sample_time_s,
            heading_deg: self.heading_deg.iter().map(|h| h - offset_deg).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Speed of travel along a path, by finite differences. The first sample is
/// zero.
pub fn center_speeds(positions: &[Vector2<f64>], sample_time_s: f64) -> Vec<f64> {
    let mut speed = vec![0.0; positions.len()];

    for i in 1..positions.len() {
        speed[i] = (positions[i] - positions[i - 1]).norm() / sample_time_s;
    }

    speed
}

/// Build the corrected velocity profile from a raw one.
///
/// The raw profile is copied with its final sample set to zero, smoothed, and
/// then passed through [`velocity_fix`] so it travels the same distance as
/// the raw profile.
pub fn correct_velocity(
    raw: &VelocityProfile,
    smoothing: &SmoothParams,
    fix_tolerance: f64,
    fix_max_iterations: usize,
) -> Result<VelocityProfile, PlanError> {
    let mut target = raw.speed.clone();
    if let Some(last) = target.last_mut() {
        *last = 0.0;
    }

    let smoothed = smooth(&target, smoothing)?;

    let fixed = velocity_fix(
        smoothed,
        &raw.speed,
        raw.sample_time_s,
        fix_tolerance,
        fix_max_iterations,
    )?;

    Ok(VelocityProfile::new(raw.sample_time_s, fixed))
}

/// Shift the interior samples of `smoothed` until the distance it covers
/// matches that of `original` to within `tolerance`.
///
/// Each iteration removes `error / 50` from every interior sample, where
/// `error` is the smoothed distance minus the original distance. The first
/// and last samples are not changed.
pub fn velocity_fix(
    mut smoothed: Vec<f64>,
    original: &[f64],
    sample_time_s: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Vec<f64>, PlanError> {
    let target = total_distance(original, sample_time_s);
    let mut error = total_distance(&smoothed, sample_time_s) - target;
    let mut iterations = 0;

    while error.abs() > tolerance {
        if iterations >= max_iterations || !error.is_finite() {
            return Err(PlanError::VelocityFixNotConverged {
                iterations,
                residual: error,
            });
        }

        let step = error / VELOCITY_FIX_STEP_DIVISOR;

        let n = smoothed.len();
        for v in smoothed.iter_mut().take(n.saturating_sub(1)).skip(1) {
            *v -= step;
        }

        error = total_distance(&smoothed, sample_time_s) - target;
        iterations += 1;
    }

    trace!(
        "Velocity fix converged after {} iterations, residual {:e}",
        iterations,
        error
    );

    Ok(smoothed)
}

/// Running sum of `speed * sample_time_s`, starting from the first speed.
fn cumulative_distance(speed: &[f64], sample_time_s: f64) -> Vec<f64> {
    let mut dist = Vec::with_capacity(speed.len());

    if let Some(first) = speed.first() {
        dist.push(*first);
    }

    for s in speed.iter().skip(1) {
        let prev = dist.last().copied().unwrap_or(0.0);
        dist.push(prev + s * sample_time_s);
    }

    dist
}

fn total_distance(speed: &[f64], sample_time_s: f64) -> f64 {
    cumulative_distance(speed, sample_time_s)
        .last()
        .copied()
        .unwrap_or(0.0)
}
