//! Mecanum drive wheel calculations
//!
//! Each mecanum wheel has its rollers mounted at 45 degrees to the wheel
//! axis, so a wheel only constrains motion along one diagonal of the body.
//! With the rollers in the usual "X" arrangement (seen from above), the front
//! left and rear right wheels drive along `forward + right`, while the front
//! right and rear left wheels drive along `forward - right`. The speed a wheel
//! must turn at is therefore the body frame velocity of its contact point
//! projected onto `forward + c * right`, with `c` the wheel's lateral sign.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::{rotate, Wheel, WheelPath};
use crate::path::Path;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the four wheel paths of a mecanum drive.
///
/// The body orientation at each sample is the heading field of the center
/// path (degrees, anticlockwise, zero when the body's forward axis is along
/// +y).
pub(super) fn calc_mecanum(
    track_width: f64,
    track_length: f64,
    center: &Path,
    sample_time_s: f64,
) -> Vec<WheelPath> {
    let half_w = track_width / 2.0;
    let half_l = track_length / 2.0;

    let headings_rad: Vec<f64> = center
        .points
        .iter()
        .map(|p| p.heading_deg.to_radians())
        .collect();

    let layout = [
        (Wheel::FrontLeft, Vector2::new(-half_w, half_l), 1.0),
        (Wheel::FrontRight, Vector2::new(half_w, half_l), -1.0),
        (Wheel::RearLeft, Vector2::new(-half_w, -half_l), -1.0),
        (Wheel::RearRight, Vector2::new(half_w, -half_l), 1.0),
    ];

    layout
        .iter()
        .map(|(wheel, offset, lateral_sign)| {
            let path: Vec<Vector2<f64>> = center
                .points
                .iter()
                .zip(headings_rad.iter())
                .map(|(p, h)| p.position + rotate(offset, *h))
                .collect();

            let mut speed = vec![0.0; path.len()];
            for i in 1..path.len() {
                // Displacement in the body frame at the start of the step
                let body = rotate(&(path[i] - path[i - 1]), -headings_rad[i - 1]);
                speed[i] = (body[1] + lateral_sign * body[0]) / sample_time_s;
            }

            WheelPath {
                wheel: *wheel,
                path,
                speed,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_kin::Side;
    use crate::path::Waypoint;

    fn line(step: Vector2<f64>, heading_deg: f64) -> Path {
        Path::new(
            (0..10)
                .map(|i| {
                    let p = step * i as f64;
                    Waypoint::with_heading(p[0], p[1], heading_deg)
                })
                .collect(),
        )
    }

    #[test]
    fn test_forward() {
        let wheels = calc_mecanum(2.0, 3.0, &line(Vector2::new(0.0, 0.1), 0.0), 0.1);

        assert_eq!(wheels.len(), 4);
        assert!((wheels[0].path[0] - Vector2::new(-1.0, 1.5)).norm() < 1e-12);
        assert!((wheels[3].path[0] - Vector2::new(1.0, -1.5)).norm() < 1e-12);

        for w in wheels.iter() {
            assert_eq!(w.speed[0], 0.0);
            assert!((w.speed[5] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_strafe_right() {
        let wheels = calc_mecanum(2.0, 3.0, &line(Vector2::new(0.1, 0.0), 0.0), 0.1);

        let expected = [1.0, -1.0, -1.0, 1.0];
        for (w, e) in wheels.iter().zip(expected.iter()) {
            assert!((w.speed[3] - e).abs() < 1e-9, "{:?}: {}", w.wheel, w.speed[3]);
        }
    }

    #[test]
    fn test_rotated_body_forward() {
        // Heading 90 deg means forward is -x
        let wheels = calc_mecanum(2.0, 3.0, &line(Vector2::new(-0.1, 0.0), 90.0), 0.1);

        for w in wheels.iter() {
            assert!((w.speed[4] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_turn_in_place() {
        // Anticlockwise spin with a fixed center: left wheels reverse
        let center = Path::new(
            (0..10)
                .map(|i| Waypoint::with_heading(0.0, 0.0, 2.0 * i as f64))
                .collect(),
        );
        let wheels = calc_mecanum(2.0, 3.0, &center, 0.1);

        for w in wheels.iter() {
            match w.wheel.side() {
                Side::Left => assert!(w.speed[4] < 0.0),
                Side::Right => assert!(w.speed[4] > 0.0),
            }
        }
    }
}
