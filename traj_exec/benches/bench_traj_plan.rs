//! # Trajectory Planner Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use traj_lib::{
    drive_kin::DriveKinematics,
    path::Path,
    traj_plan::{PlannerParams, TrajPlanner},
};

fn traj_plan_benchmark(c: &mut Criterion) {
    // An S shaped path with a handful of nodes, similar to a typical route
    let path = Path::from_rows(&[
        [0.0, 0.0],
        [1.0, 0.0],
        [2.0, 1.0],
        [3.0, 1.0],
        [4.0, 0.0],
        [5.0, 0.0],
    ])
    .unwrap();

    let mut planner = TrajPlanner::new(path, PlannerParams::default());

    c.bench_function("TrajPlanner::calculate::differential", |b| {
        b.iter(|| {
            planner
                .calculate(
                    5.0,
                    0.02,
                    DriveKinematics::Differential { track_width: 0.6 },
                )
                .unwrap()
        })
    });

    c.bench_function("TrajPlanner::calculate::mecanum", |b| {
        b.iter(|| {
            planner
                .calculate(
                    5.0,
                    0.02,
                    DriveKinematics::Mecanum {
                        track_width: 0.6,
                        track_length: 0.5,
                    },
                )
                .unwrap()
        })
    });
}

criterion_group!(benches, traj_plan_benchmark);
criterion_main!(benches);
