//! Differential drive wheel calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector2;

use super::{gradients_rad, rotate, Wheel, WheelPath};
use crate::path::Path;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the left and right wheel paths of a differential drive.
///
/// The wheels sit `track_width / 2` either side of the center point,
/// perpendicular to the direction of travel. Wheel speed is the wheel's
/// displacement projected onto the direction the body was facing over that
/// step, so a wheel moving backwards (the inside wheel of a turn tighter than
/// half the track width) has a negative speed.
pub(super) fn calc_differential(track_width: f64, center: &Path, sample_time_s: f64) -> Vec<WheelPath> {
    let positions = center.positions();
    let gradients = gradients_rad(&positions);
    let half_track = Vector2::new(track_width / 2.0, 0.0);

    let mut left = Vec::with_capacity(positions.len());
    let mut right = Vec::with_capacity(positions.len());

    for (p, g) in positions.iter().zip(gradients.iter()) {
        let offset = rotate(&half_track, g + FRAC_PI_2);
        left.push(p + offset);
        right.push(p - offset);
    }

    vec![
        WheelPath {
            wheel: Wheel::Left,
            speed: projected_speeds(&left, &gradients, sample_time_s),
            path: left,
        },
        WheelPath {
            wheel: Wheel::Right,
            speed: projected_speeds(&right, &gradients, sample_time_s),
            path: right,
        },
    ]
}

fn projected_speeds(path: &[Vector2<f64>], gradients: &[f64], sample_time_s: f64) -> Vec<f64> {
    let mut speed = vec![0.0; path.len()];

    for i in 1..path.len() {
        let forward = Vector2::new(gradients[i - 1].cos(), gradients[i - 1].sin());
        speed[i] = (path[i] - path[i - 1]).dot(&forward) / sample_time_s;
    }

    speed
}
