//! Benchmarks for the color map: first insertion pays the key
//! allocation, recoloring an existing cell must not allocate at all.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blockgc::triset::Triset;
use blockgc::Cid;

fn keys(count: usize) -> Vec<Cid> {
    (0..count)
        .map(|i| Cid::new(format!("bench-key-{i:08}").into_bytes()))
        .collect()
}

fn colmap_insert(c: &mut Criterion) {
    let keys = keys(10_000);
    c.bench_function("colmap_insert", |b| {
        b.iter(|| {
            let mut set = Triset::new();
            for key in &keys {
                set.insert_white(black_box(key));
            }
            set.len()
        })
    });
}

fn colmap_update(c: &mut Criterion) {
    let keys = keys(10_000);
    c.bench_function("colmap_update", |b| {
        let mut set = Triset::new();
        for key in &keys {
            set.insert_white(key);
        }
        b.iter(|| {
            for key in &keys {
                set.blacken(black_box(key));
            }
            set.len()
        })
    });
}

criterion_group!(benches, colmap_insert, colmap_update);
criterion_main!(benches);
