//! Planning of how many points to inject at each refinement stage

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of inject-and-smooth stages used to build the dense path.
pub const NUM_STAGES: usize = 3;

/// Below this many target points only two stages are used.
const FEW_POINTS_THRESHOLD: f64 = 100.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The number of points to inject at each stage, and the number of points
/// the dense path will have once all stages are complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionPlan {
    pub counts: [usize; NUM_STAGES],
    pub num_final_points: usize,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Choose the injection counts which give the most points not exceeding
/// `duration_s / sample_time_s`.
///
/// If the target is below 100 points two stages are searched (first count in
/// 4 to 6, second in 1 to 8) and the third count is zero. Otherwise three
/// stages are searched (1 to 8, 1 to 10, 1 to 9). Combinations are visited in
/// order and only a strictly larger total replaces the current best, so ties
/// go to the first combination found.
///
/// Paths with many nodes may not fit any of those combinations, in which case
/// one or two stages are searched instead (first count from 1 up, second in
/// 0 to 10).
///
/// Returns `None` if no combination fits in the target.
pub fn injection_counter(
    num_nodes: usize,
    duration_s: f64,
    sample_time_s: f64,
) -> Option<InjectionPlan> {
    let target = duration_s / sample_time_s;

    let preferred = if target < FEW_POINTS_THRESHOLD {
        best_plan(num_nodes, target, (4..=6).flat_map(|i| (1..=8).map(move |j| [i, j, 0])))
    } else {
        best_plan(
            num_nodes,
            target,
            (1..=8).flat_map(|i| (1..=10).flat_map(move |j| (1..=9).map(move |k| [i, j, k]))),
        )
    };

    preferred.or_else(|| {
        // A single stage grows the path the least, so no first count above
        // this can fit.
        let max_first = match num_nodes {
            0 | 1 => 0,
            n => (target as usize).saturating_sub(n) / (n - 1),
        };

        best_plan(
            num_nodes,
            target,
            (1..=max_first).flat_map(|i| (0..=10).map(move |j| [i, j, 0])),
        )
    })
}

/// The combination of counts with the largest total not exceeding `target`.
fn best_plan<I>(num_nodes: usize, target: f64, candidates: I) -> Option<InjectionPlan>
where
    I: Iterator<Item = [usize; NUM_STAGES]>,
{
    let mut best: Option<InjectionPlan> = None;

    for counts in candidates {
        let total = counts
            .iter()
            .fold(num_nodes, |n, c| stage_points(n, *c));

        let best_total = best.map(|b| b.num_final_points).unwrap_or(0);

        if (total as f64) <= target && total > best_total {
            best = Some(InjectionPlan {
                counts,
                num_final_points: total,
            });
        }
    }

    best
}

/// Number of points after injecting `count` points between each pair of `n`.
pub fn stage_points(n: usize, count: usize) -> usize {
    if n == 0 {
        return 0;
    }
    count * (n - 1) + n
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_three_stages() {
        let plan = injection_counter(2, 5.0, 0.02).unwrap();
        assert_eq!(plan.counts, [4, 6, 6]);
        assert_eq!(plan.num_final_points, 246);

        let plan = injection_counter(3, 5.0, 0.02).unwrap();
        assert_eq!(plan.counts, [1, 5, 9]);
        assert_eq!(plan.num_final_points, 241);
    }

    #[test]
    fn test_two_stages() {
        // Exactly on the target
        let plan = injection_counter(2, 1.0, 0.02).unwrap();
        assert_eq!(plan.counts, [6, 6, 0]);
        assert_eq!(plan.num_final_points, 50);

        let plan = injection_counter(3, 2.0, 0.05).unwrap();
        assert_eq!(plan.counts, [5, 2, 0]);
        assert_eq!(plan.num_final_points, 37);
    }

    #[test]
    fn test_many_nodes() {
        // Too many nodes for three stages, one or two stages still fit
        let plan = injection_counter(40, 5.0, 0.02).unwrap();
        assert_eq!(plan.counts, [1, 2, 0]);
        assert_eq!(plan.num_final_points, 235);

        let plan = injection_counter(100, 5.0, 0.02).unwrap();
        assert_eq!(plan.counts, [1, 0, 0]);
        assert_eq!(plan.num_final_points, 199);

        // Not even one injected point fits
        assert_eq!(injection_counter(200, 5.0, 0.02), None);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(injection_counter(2, 0.02, 0.02), None);
        assert_eq!(injection_counter(10, 0.1, 0.02), None);

        // Below the two stage table, but a couple of points still fit
        let plan = injection_counter(2, 0.1, 0.02).unwrap();
        assert_eq!(plan.counts, [1, 1, 0]);
        assert_eq!(plan.num_final_points, 5);
    }

    #[test]
    fn test_stage_points() {
        assert_eq!(stage_points(2, 4), 6);
        assert_eq!(stage_points(6, 0), 6);
        assert_eq!(stage_points(0, 3), 0);
    }
}
