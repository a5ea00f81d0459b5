//! Linear upsampling of a path

use super::Path;

/// Insert `num_to_inject` linearly interpolated points between each pair of
/// consecutive points of the path.
///
/// The output contains all of the input points, in order, and has length
/// `n + (n - 1) * num_to_inject`. Headings are interpolated in the same way as
/// positions.
pub fn inject(path: &Path, num_to_inject: usize) -> Path {
    let points = &path.points;

    if points.len() < 2 || num_to_inject == 0 {
        return path.clone();
    }

    let mut out = Vec::with_capacity(points.len() + (points.len() - 1) * num_to_inject);
    let step = 1.0 / (num_to_inject + 1) as f64;

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);

        for j in 1..=num_to_inject {
            out.push((b - a) * (j as f64 * step) + a);
        }
    }

    out.push(points[points.len() - 1]);

    Path::new(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::Waypoint;

    #[test]
    fn test_inject() {
        let path = Path::from_rows(&[[0.0, 0.0, 0.0], [4.0, 8.0, 40.0], [4.0, 0.0, 40.0]]).unwrap();
        let injected = inject(&path, 3);

        assert_eq!(injected.get_num_points(), 3 + 2 * 3);

        // Original points are kept in place
        assert_eq!(injected.points[0], path.points[0]);
        assert_eq!(injected.points[4], path.points[1]);
        assert_eq!(injected.points[8], path.points[2]);

        // Interpolated points are evenly spaced
        assert_eq!(injected.points[1], Waypoint::with_heading(1.0, 2.0, 10.0));
        assert_eq!(injected.points[2], Waypoint::with_heading(2.0, 4.0, 20.0));
        assert_eq!(injected.points[3], Waypoint::with_heading(3.0, 6.0, 30.0));
        assert_eq!(injected.points[6], Waypoint::with_heading(4.0, 4.0, 40.0));
    }

    #[test]
    fn test_inject_nothing() {
        let path = Path::from_rows(&[[0.0, 0.0], [1.0, 0.0]]).unwrap();
        assert_eq!(inject(&path, 0), path);
        assert_eq!(inject(&Path::new_empty(), 4), Path::new_empty());
    }
}
