//! Benchmarks for hazard region labeling.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use seaice::grid::{Grid, HazardCriteria};

fn striped(size: usize) -> Grid {
    let samples = (0..size * size)
        .map(|i| if (i / size) % 4 == 3 { 40 } else { 90 })
        .collect();
    Grid::from_raw(size, size, samples).unwrap()
}

fn labeler_benchmark(c: &mut Criterion) {
    let criteria = HazardCriteria::default();

    c.bench_function("label_saturated_512", |b| {
        let grid = Grid::filled(512, 512, 90).unwrap();
        b.iter_batched(
            || grid.clone(),
            |mut grid| black_box(criteria.labeler().apply(&mut grid)),
            BatchSize::LargeInput,
        );
    });

    c.bench_function("label_striped_512", |b| {
        let grid = striped(512);
        b.iter_batched(
            || grid.clone(),
            |mut grid| black_box(criteria.labeler().apply(&mut grid)),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, labeler_benchmark);
criterion_main!(benches);
