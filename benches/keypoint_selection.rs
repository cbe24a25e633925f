use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dynamics_keypoints::{
    evaluate, evaluate_all, select_keypoints, ChannelLayout, InterpolationConfig,
    InterpolationOrder, Trajectory,
};
use nalgebra::DMatrix;

/// 7-DOF arm rollout with smooth sensitivities.
fn arm_rollout(n: usize) -> Trajectory {
    let layout = ChannelLayout::actuated(7);
    let ns = layout.num_states();
    Trajectory::new(
        DMatrix::from_fn(n, ns, |t, c| (t as f64 * 0.01 * (c + 1) as f64).sin()),
        DMatrix::from_fn(n, 7, |t, c| (t as f64 * 0.02 + c as f64).cos()),
        (0..n)
            .map(|t| DMatrix::from_fn(ns, ns, |r, c| (t as f64 * 0.005 + (r * ns + c) as f64).sin()))
            .collect(),
        (0..n)
            .map(|t| DMatrix::from_fn(ns, 7, |r, c| (t as f64 * 0.003 * (r + 1) as f64).cos() + c as f64))
            .collect(),
        layout,
    )
    .expect("valid rollout")
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_keypoints");
    for n in [250usize, 1000] {
        let trajectory = arm_rollout(n);
        for config in InterpolationConfig::standard_suite(5, 100, 5e-4) {
            group.bench_with_input(
                BenchmarkId::new(config.method.name(), n),
                &config,
                |b, cfg| {
                    b.iter(|| {
                        let keypoints = select_keypoints(black_box(&trajectory), cfg)
                            .expect("valid configuration");
                        black_box(keypoints)
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_reconstruction_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let trajectory = arm_rollout(1000);
    for order in [
        InterpolationOrder::Linear,
        InterpolationOrder::Quadratic,
        InterpolationOrder::Cubic,
    ] {
        let config = InterpolationConfig::set_interval(10).with_order(order);
        group.bench_with_input(
            BenchmarkId::new("set_interval", format!("{order:?}")),
            &config,
            |b, cfg| {
                b.iter(|| black_box(evaluate(black_box(&trajectory), cfg).expect("evaluates")));
            },
        );
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let trajectory = arm_rollout(1000);
    let configs = InterpolationConfig::standard_suite(5, 100, 5e-4);
    c.bench_function("evaluate_all/standard_suite", |b| {
        b.iter(|| black_box(evaluate_all(black_box(&trajectory), &configs)));
    });
}

criterion_group!(benches, bench_selection, bench_reconstruction_order, bench_batch);
criterion_main!(benches);
