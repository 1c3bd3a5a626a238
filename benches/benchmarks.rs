use criterion::{black_box, criterion_group, criterion_main, Criterion, BatchSize};
use peg_tanner::peg::PegConfig;

pub fn peg_benchmarks(c: &mut Criterion) {
    c.bench_function("PegConfig::construct (100, 200, 3)", |b| {
        let config = PegConfig::regular(100, 200, 3).unwrap();
        b.iter(|| black_box(config.construct().unwrap()))
    });
    c.bench_function("PegConfig::steps (30, 60, 3)", |b| {
        let config = PegConfig::regular(30, 60, 3).unwrap();
        b.iter(|| black_box(config.steps().unwrap().count()))
    });
    c.bench_function("TannerGraph::expand", |b| {
        let graph = PegConfig::regular(100, 200, 3).unwrap().construct().unwrap();
        b.iter(|| black_box(graph.expand(black_box(17), 8).unwrap()))
    });
    c.bench_function("TannerGraph::girth", |b| {
        b.iter_batched_ref(
            || PegConfig::regular(50, 100, 3).unwrap().construct().unwrap(),
            |graph| black_box(graph.girth()),
            BatchSize::SmallInput
        )
    });
}

criterion_group!(benches, peg_benchmarks);
criterion_main!(benches);
