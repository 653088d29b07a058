// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use lutresub::cut_resub::cut_resub;
use lutresub::min_depth::MinDepthAnalyzer;
use lutresub::test_utils::random_problem;

fn resub_benchmark(c: &mut Criterion) {
    let p = random_problem(0xbe7c4, 32, 2000, 16, 6);

    c.bench_function("cut_resub_unconstrained", |b| {
        b.iter_batched(
            || p.maprec.clone(),
            |mut maprec| {
                let stats = cut_resub(&p.graph, &p.holder, &mut maprec, None);
                black_box(stats);
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("cut_resub_slack_0", |b| {
        b.iter_batched(
            || p.maprec.clone(),
            |mut maprec| {
                let stats = cut_resub(&p.graph, &p.holder, &mut maprec, Some(0));
                black_box(stats);
            },
            BatchSize::SmallInput,
        )
    });
}

fn min_depth_benchmark(c: &mut Criterion) {
    let p = random_problem(0xde9, 32, 2000, 16, 6);
    let mut analyzer = MinDepthAnalyzer::new(&p.graph);
    let mut depths = Vec::new();
    c.bench_function("min_depth_k6", |b| {
        b.iter(|| black_box(analyzer.run(6, &mut depths)))
    });
}

criterion_group!(benches, resub_benchmark, min_depth_benchmark);
criterion_main!(benches);
