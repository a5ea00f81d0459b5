//! # Gradient descent smoother
//!
//! The smoother relaxes each interior point of a sequence towards both its
//! original value (weighted by `data_weight`) and the midpoint of its
//! neighbours (weighted by `smooth_weight`). Updates are made in place, so the
//! new value of point `i - 1` is used when updating point `i`. The first and
//! last points are never moved.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::{PathError, Waypoint};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A value which can be smoothed.
pub trait Smoothable:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
    /// Sum of the absolute values of all components.
    fn abs_sum(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothParams {
    /// Weight pulling each point back towards its original value.
    pub data_weight: f64,

    /// Weight pulling each point towards the midpoint of its neighbours.
    pub smooth_weight: f64,

    /// Iteration stops once the total change over one sweep drops below this.
    pub tolerance: f64,

    /// Maximum number of sweeps before the smoother gives up.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Smoothable for f64 {
    fn abs_sum(&self) -> f64 {
        self.abs()
    }
}

impl Smoothable for Waypoint {
    fn abs_sum(&self) -> f64 {
        self.position.iter().map(|v| v.abs()).sum::<f64>() + self.heading_deg.abs()
    }
}

impl SmoothParams {
    pub fn new(data_weight: f64, smooth_weight: f64, tolerance: f64) -> Self {
        Self {
            data_weight,
            smooth_weight,
            tolerance,
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.data_weight.is_finite()
            && self.data_weight >= 0.0
            && self.smooth_weight.is_finite()
            && self.smooth_weight >= 0.0
            && self.tolerance.is_finite()
            && self.tolerance > 0.0
            && self.max_iterations > 0
    }
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            data_weight: 0.7,
            smooth_weight: 0.3,
            tolerance: 1e-7,
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> usize {
    100_000
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Smooth a sequence of values, returning the smoothed copy.
///
/// Sequences with fewer than three values have no interior points and are
/// returned unchanged.
pub fn smooth<T: Smoothable>(values: &[T], params: &SmoothParams) -> Result<Vec<T>, PathError> {
    if !params.is_valid() {
        return Err(PathError::InvalidSmoothParams(*params));
    }

    let mut new = values.to_vec();

    if values.len() < 3 {
        return Ok(new);
    }

    let a = params.data_weight;
    let b = params.smooth_weight;

    let mut change = params.tolerance;
    let mut iterations = 0;

    while change >= params.tolerance {
        if iterations >= params.max_iterations {
            return Err(PathError::SmootherNotConverged {
                iterations,
                change,
                tolerance: params.tolerance,
            });
        }

        change = 0.0;

        for i in 1..values.len() - 1 {
            let prev = new[i];

            new[i] = new[i]
                + (values[i] - new[i]) * a
                + (new[i - 1] + new[i + 1] - new[i] * 2.0) * b;

            change += (prev - new[i]).abs_sum();
        }

        iterations += 1;
    }

    Ok(new)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_endpoints_fixed() {
        let values = vec![0.0, 10.0, 0.0, 10.0, 0.0, 3.0];
        let smoothed = smooth(&values, &SmoothParams::default()).unwrap();

        assert_eq!(smoothed.len(), values.len());
        assert_eq!(smoothed[0], values[0]);
        assert_eq!(smoothed[5], values[5]);

        // The zig-zag is flattened
        assert!(smoothed[1] < 10.0);
        assert!(smoothed[2] > 0.0);
    }

    #[test]
    fn test_straight_line_unchanged() {
        let values: Vec<Waypoint> = (0..10).map(|i| Waypoint::new(i as f64, 2.0 * i as f64)).collect();
        let smoothed = smooth(&values, &SmoothParams::default()).unwrap();

        for (s, v) in smoothed.iter().zip(values.iter()) {
            assert!((*s - *v).abs_sum() < 1e-9);
        }
    }

    #[test]
    fn test_waypoint_corner() {
        let values = vec![
            Waypoint::new(0.0, 0.0),
            Waypoint::new(1.0, 0.0),
            Waypoint::new(2.0, 0.0),
            Waypoint::new(2.0, 1.0),
            Waypoint::new(2.0, 2.0),
        ];
        let smoothed = smooth(&values, &SmoothParams::default()).unwrap();

        assert_eq!(smoothed[0], values[0]);
        assert_eq!(smoothed[4], values[4]);

        // Corner is pulled inside the turn
        assert!(smoothed[2].x() < 2.0);
        assert!(smoothed[2].y() > 0.0);
    }

    #[test]
    fn test_not_converged() {
        let values = vec![0.0, 10.0, 0.0, 10.0, 0.0];
        let params = SmoothParams {
            max_iterations: 1,
            ..SmoothParams::default()
        };

        match smooth(&values, &params) {
            Err(PathError::SmootherNotConverged { iterations: 1, .. }) => (),
            r => panic!("Expected smoother not converged, got {:?}", r),
        }
    }

    #[test]
    fn test_invalid_params() {
        let params = SmoothParams::new(0.1, 0.3, 0.0);
        assert!(matches!(
            smooth(&[0.0, 1.0, 2.0], &params),
            Err(PathError::InvalidSmoothParams(_))
        ));
    }

    #[test]
    fn test_short_sequences() {
        assert_eq!(smooth(&[1.0, 2.0], &SmoothParams::default()).unwrap(), vec![1.0, 2.0]);
        assert!(smooth::<f64>(&[], &SmoothParams::default()).unwrap().is_empty());
    }
}
