//! Orchestrator throughput benchmarks.
//!
//! Run with: `cargo bench -p fleet_ai`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fleet_ai::prelude::*;
use fleet_test_utils::fixtures::{enemy_at, player_ship_at, PLAYER_ID};
use fleet_test_utils::sandbox::Sandbox;

fn fleet(size: u64) -> Sandbox {
    let mut sandbox = Sandbox::new(AiConfig::default());
    sandbox.spawn_player(player_ship_at(PLAYER_ID, 0.0, 0.0));
    for id in 1..=size {
        let angle = id as f32 * 0.61;
        let radius = 1_000.0 + (id % 40) as f32 * 150.0;
        let ship = enemy_at(id, radius * angle.cos(), radius * angle.sin());
        let profile = if id % 5 == 0 {
            BehaviorProfile::rammer()
        } else {
            BehaviorProfile::fighter()
        };
        sandbox.spawn(ship, profile, id % 17 == 0);
    }
    sandbox
}

/// Ticks a mixed fleet through the orchestrator and kinematics.
pub fn orchestrator_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("orchestrator_tick");
    for size in [16u64, 128, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sandbox = fleet(size);
            b.iter(|| black_box(sandbox.step(1.0 / 60.0, None)));
        });
    }
    group.finish();
}

/// Intercept prediction in isolation.
pub fn lead_target_benchmark(c: &mut Criterion) {
    c.bench_function("lead_target", |b| {
        b.iter(|| {
            lead_target(
                black_box(Vec2::new(10.0, -20.0)),
                black_box(Vec2::new(900.0, 400.0)),
                black_box(Vec2::new(-60.0, 35.0)),
                black_box(400.0),
            )
        })
    });
}

criterion_group!(benches, orchestrator_benchmark, lead_target_benchmark);
criterion_main!(benches);
