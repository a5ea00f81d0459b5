//! # Path
//!
//! This module defines the waypoint path used by the trajectory planner, along
//! with the operations used to turn a sparse set of waypoints into a dense,
//! smooth path:
//!
//! - [`node_only_waypoints`] - reduce a path to the points where the direction
//!   of travel or the heading changes.
//! - [`inject`] - upsample a path by linear interpolation.
//! - [`smooth`] - relax a path towards a smooth curve by gradient descent.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod inject;
mod reduce;
mod smooth;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::ops::{Add, Mul, Sub};

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
pub use inject::inject;
pub use reduce::{node_only_waypoints, DIRECTION_CHANGE_THRESHOLD_RAD};
pub use smooth::{smooth, SmoothParams, Smoothable};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point of a path, in the planar coordinate frame of the route.
///
/// Units of the position are the same as those of the vehicle's track
/// dimensions (e.g. feet).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the point
    pub position: Vector2<f64>,

    /// Commanded vehicle heading at this point.
    ///
    /// Units: degrees
    #[serde(default)]
    pub heading_deg: f64,
}

/// An ordered sequence of waypoints. The order is never changed by any path
/// operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("A path needs at least 2 points, found {0}")]
    NotEnoughPoints(usize),

    #[error("Point {0} of the path contains a non-finite value")]
    NonFinitePoint(usize),

    #[error("Waypoint {index} has {len} elements, expected 2 (x, y) or 3 (x, y, heading)")]
    InvalidWaypoint { index: usize, len: usize },

    #[error("Invalid smoothing parameters: {0:?}")]
    InvalidSmoothParams(SmoothParams),

    #[error(
        "Smoother did not converge after {iterations} iterations (last change {change:e}, \
        tolerance {tolerance:e})"
    )]
    SmootherNotConverged {
        iterations: usize,
        change: f64,
        tolerance: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// Create a new waypoint with zero heading.
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_heading(x, y, 0.0)
    }

    /// Create a new waypoint with the given heading in degrees.
    pub fn with_heading(x: f64, y: f64, heading_deg: f64) -> Self {
        Self {
            position: Vector2::new(x, y),
            heading_deg,
        }
    }

    /// Build a waypoint from either `[x, y]` or `[x, y, heading_deg]`.
    pub fn from_slice(index: usize, values: &[f64]) -> Result<Self, PathError> {
        match *values {
            [x, y] => Ok(Self::new(x, y)),
            [x, y, h] => Ok(Self::with_heading(x, y, h)),
            _ => Err(PathError::InvalidWaypoint {
                index,
                len: values.len(),
            }),
        }
    }

    pub fn x(&self) -> f64 {
        self.position[0]
    }

    pub fn y(&self) -> f64 {
        self.position[1]
    }

    /// True if every field of the waypoint is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite()) && self.heading_deg.is_finite()
    }
}

impl Add for Waypoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            position: self.position + rhs.position,
            heading_deg: self.heading_deg + rhs.heading_deg,
        }
    }
}

impl Sub for Waypoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            position: self.position - rhs.position,
            heading_deg: self.heading_deg - rhs.heading_deg,
        }
    }
}

impl Mul<f64> for Waypoint {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            position: self.position * rhs,
            heading_deg: self.heading_deg * rhs,
        }
    }
}

impl Path {
    /// Create a new path from a list of points.
    pub fn new(points: Vec<Waypoint>) -> Self {
        Self { points }
    }

    /// Create a new empty path
    pub fn new_empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a path from rows of `[x, y]` or `[x, y, heading_deg]`.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, PathError> {
        let points = rows
            .iter()
            .enumerate()
            .map(|(i, r)| Waypoint::from_slice(i, r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { points })
    }

    /// Check that the path can be planned: at least two points, all finite.
    pub fn validate(&self) -> Result<(), PathError> {
        if self.points.len() < 2 {
            return Err(PathError::NotEnoughPoints(self.points.len()));
        }

        match self.points.iter().position(|p| !p.is_finite()) {
            Some(i) => Err(PathError::NonFinitePoint(i)),
            None => Ok(()),
        }
    }

    /// Get the number of points in the path
    pub fn get_num_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.points.last()
    }

    /// Return the length of the path in position units.
    ///
    /// If the path is empty (not enough points) then `None` is returned.
    pub fn get_length(&self) -> Option<f64> {
        if self.points.len() < 2 {
            return None;
        }

        Some(
            self.points
                .windows(2)
                .map(|w| (w[1].position - w[0].position).norm())
                .sum(),
        )
    }

    /// Get just the positions of the points in the path.
    pub fn positions(&self) -> Vec<Vector2<f64>> {
        self.points.iter().map(|p| p.position).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_rows() {
        let path = Path::from_rows(&[vec![0.0, 0.0], vec![1.0, 2.0, 90.0]]).unwrap();
        assert_eq!(path.points[0], Waypoint::new(0.0, 0.0));
        assert_eq!(path.points[1], Waypoint::with_heading(1.0, 2.0, 90.0));

        match Path::from_rows(&[vec![0.0, 0.0], vec![1.0]]) {
            Err(PathError::InvalidWaypoint { index: 1, len: 1 }) => (),
            r => panic!("Expected invalid waypoint error, got {:?}", r),
        }
    }

    #[test]
    fn test_validate() {
        assert!(Path::from_rows(&[[0.0, 0.0], [1.0, 0.0]]).unwrap().validate().is_ok());

        match Path::from_rows(&[[0.0, 0.0]]).unwrap().validate() {
            Err(PathError::NotEnoughPoints(1)) => (),
            r => panic!("Expected not enough points, got {:?}", r),
        }

        match Path::from_rows(&[[0.0, 0.0], [std::f64::NAN, 1.0]])
            .unwrap()
            .validate()
        {
            Err(PathError::NonFinitePoint(1)) => (),
            r => panic!("Expected non-finite point, got {:?}", r),
        }
    }

    #[test]
    fn test_length() {
        let path = Path::from_rows(&[[0.0, 0.0], [3.0, 4.0], [3.0, 10.0]]).unwrap();
        assert_eq!(path.get_length(), Some(11.0));
        assert_eq!(Path::new_empty().get_length(), None);
    }
}
