//! Routing benchmarks.
//!
//! Run with: `cargo bench -p flongo-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flongo_core::HttpMethod;
use flongo_router::Router;

fn build_router(num_routes: usize) -> Router<usize> {
    let mut router = Router::new();
    for i in 0..num_routes / 2 {
        let _ = router.insert(&format!("/api/resource{i}"), HttpMethod::Get, i);
        let _ = router.insert(&format!("/api/resource{i}/<id>"), HttpMethod::Delete, i);
    }
    router
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_route");
    for size in [10, 100, 1000] {
        let router = build_router(size);
        let path = format!("/api/resource{}/abc", size / 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &path, |b, path| {
            b.iter(|| router.match_route(HttpMethod::Delete, black_box(path)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_match);
criterion_main!(benches);
