use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use fpsearch::DescriptorMatrix;
use fpsearch::knn::{BruteForceMatcher, NearestNeighbors};
use fpsearch::matcher::{RATIO_THRESHOLD, count_good_matches};
use rand::prelude::*;

const DIM: usize = 128;

fn random_matrix(rng: &mut impl Rng, rows: usize) -> DescriptorMatrix {
    let data = (0..rows * DIM).map(|_| rng.random_range(0f32..255.)).collect();
    DescriptorMatrix::from_flat(DIM, data).unwrap()
}

fn bench_knn2(c: &mut Criterion) {
    let mut group = c.benchmark_group("BruteForce");
    let mut rng = rand::rng();
    // 典型的指纹图片 SIFT 特征点数量
    let query = random_matrix(&mut rng, 300);
    let train = random_matrix(&mut rng, 500);

    group.throughput(Throughput::Elements((query.len() * train.len()) as u64));
    group.bench_function("knn2", |b| {
        b.iter(|| BruteForceMatcher.knn2(black_box(&query), black_box(&train)).unwrap())
    });
    group.bench_function("count_good_matches", |b| {
        b.iter(|| {
            let (query, train) = (black_box(&query), black_box(&train));
            count_good_matches(query, train, &BruteForceMatcher, RATIO_THRESHOLD).unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_knn2);
criterion_main!(benches);
