use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nnstore_core::index::{LpDistance, VpTree};
use nnstore_core::platform::NullProgress;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect()
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("vptree_build");
    for &size in &[100usize, 1_000, 10_000] {
        let data = random_vectors(size, 8, 1);
        group.bench_with_input(BenchmarkId::new("build", size), &data, |b, data| {
            b.iter(|| {
                let tree = VpTree::build(black_box(data), LpDistance::L2, &NullProgress).unwrap();
                black_box(tree);
            });
        });
    }
    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let data = random_vectors(10_000, 8, 2);
    let tree = VpTree::build(&data, LpDistance::L2, &NullProgress).unwrap();
    let query = random_vectors(1, 8, 3).remove(0);

    let mut group = c.benchmark_group("vptree_search");
    for &k in &[1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("search", k), &k, |b, &k| {
            b.iter(|| {
                let hits = tree.search(black_box(&query), k, black_box(&data)).unwrap();
                black_box(hits);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_search);
criterion_main!(benches);
