use criterion::{black_box, criterion_group, criterion_main, Criterion};
use libdarts::DoubleArray;

/// Sorted, scattered hex keys.
fn keys(n: u32) -> Vec<String> {
    let mut keys: Vec<String> = (0..n)
        .map(|i| format!("{:08x}", i.wrapping_mul(2_654_435_761)))
        .collect();
    keys.sort_unstable();
    keys
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let keys = keys(10_000);
    let values: Vec<i32> = (0..keys.len() as i32).map(|i| i % 16).collect();

    group.bench_function("key_set", |b| {
        b.iter(|| black_box(DoubleArray::build(&keys, None, None).unwrap()))
    });

    group.bench_function("dawg", |b| {
        b.iter(|| black_box(DoubleArray::build(&keys, Some(&values[..]), None).unwrap()))
    });
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let keys = keys(10_000);
    let trie = DoubleArray::build(&keys, None, None).unwrap();

    group.bench_function("exact_match", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(trie.exact_match_search(key.as_bytes()));
            }
        })
    });

    group.bench_function("common_prefix", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(trie.common_prefix_search(key.as_bytes(), 0, 16));
            }
        })
    });

    group.bench_function("traverse", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(trie.traverse_from(key.as_bytes(), 0, 0));
            }
        })
    });
}

criterion_group!(benches, bench_build, bench_lookup);
criterion_main!(benches);
