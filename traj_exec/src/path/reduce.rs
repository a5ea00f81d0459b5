//! Reduction of a path to its direction or heading change nodes

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use util::maths::rem_euclid;

use super::{Path, Waypoint};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum change in direction of travel for which an interior point is kept.
pub const DIRECTION_CHANGE_THRESHOLD_RAD: f64 = 0.01;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Reduce a path to only the points at which something changes.
///
/// The first and last points are always kept. An interior point is kept if the
/// direction of travel into it differs from the direction out of it by at least
/// [`DIRECTION_CHANGE_THRESHOLD_RAD`], or if the heading of the next point is
/// different to its own.
///
/// Applying this function to its own output gives the same path back for any
/// path whose nodes are separated by distinct turns.
pub fn node_only_waypoints(path: &Path) -> Path {
    let points = &path.points;

    if points.len() < 3 {
        return path.clone();
    }

    let mut nodes = Vec::with_capacity(points.len());
    nodes.push(points[0]);

    for i in 1..points.len() - 1 {
        let dir_in = direction(&points[i - 1], &points[i]);
        let dir_out = direction(&points[i], &points[i + 1]);

        let turn = wrap_pi(dir_out - dir_in).abs();
        let heading_change = (points[i + 1].heading_deg - points[i].heading_deg).abs();

        if turn >= DIRECTION_CHANGE_THRESHOLD_RAD || heading_change > 0.0 {
            nodes.push(points[i]);
        }
    }

    nodes.push(points[points.len() - 1]);

    Path::new(nodes)
}

fn direction(from: &Waypoint, to: &Waypoint) -> f64 {
    let d = to.position - from.position;
    d[1].atan2(d[0])
}

/// Wrap an angle into the range [-pi, pi].
fn wrap_pi(angle: f64) -> f64 {
    let wrapped = rem_euclid(angle + PI, 2.0 * PI) - PI;

    // Round-off can leave the remainder equal to the full turn
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_straight_line_collapses() {
        let path = Path::from_rows(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [5.0, 0.0]]).unwrap();
        let nodes = node_only_waypoints(&path);

        assert_eq!(nodes.points, vec![Waypoint::new(0.0, 0.0), Waypoint::new(5.0, 0.0)]);
    }

    #[test]
    fn test_corner_kept() {
        let path = Path::from_rows(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [2.0, 2.0],
        ])
        .unwrap();
        let nodes = node_only_waypoints(&path);

        assert_eq!(
            nodes.points,
            vec![
                Waypoint::new(0.0, 0.0),
                Waypoint::new(2.0, 0.0),
                Waypoint::new(2.0, 2.0)
            ]
        );

        // Reducing again changes nothing
        assert_eq!(node_only_waypoints(&nodes), nodes);
    }

    #[test]
    fn test_sharp_turn_three_points() {
        let path = Path::from_rows(&[[0.0, 0.0], [4.0, 0.0], [0.0, 0.1]]).unwrap();
        let nodes = node_only_waypoints(&path);

        assert_eq!(nodes, path);
    }

    #[test]
    fn test_heading_change_kept() {
        // Collinear, but the heading changes between the 2nd and 3rd point
        let path = Path::from_rows(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 45.0],
            [3.0, 0.0, 45.0],
        ])
        .unwrap();
        let nodes = node_only_waypoints(&path);

        assert_eq!(
            nodes.points,
            vec![
                Waypoint::with_heading(0.0, 0.0, 0.0),
                Waypoint::with_heading(1.0, 0.0, 0.0),
                Waypoint::with_heading(3.0, 0.0, 45.0)
            ]
        );

        assert_eq!(node_only_waypoints(&nodes), nodes);
    }

    #[test]
    fn test_short_paths_unchanged() {
        let path = Path::from_rows(&[[0.0, 0.0], [1.0, 1.0]]).unwrap();
        assert_eq!(node_only_waypoints(&path), path);
        assert_eq!(node_only_waypoints(&Path::new_empty()), Path::new_empty());
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!(wrap_pi(0.0).abs() < 1e-12);
    }
}
