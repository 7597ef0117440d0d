//! Criterion benchmarks for idlecache tables: add, hit lookup, miss-driven load, most_accessed.

use std::any::Any;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use idlecache_table::{Entry, Table};

fn bench_add(c: &mut Criterion) {
    let table = Table::new("bench_add");
    let mut g = c.benchmark_group("add");
    g.throughput(Throughput::Elements(1));
    g.bench_function("add_no_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            black_box(table.add(i % 10_000, i, Duration::ZERO));
        });
    });
    g.bench_function("add_long_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            black_box(table.add(i % 10_000, i, Duration::from_secs(3600)));
        });
    });
    g.finish();
}

fn bench_get(c: &mut Criterion) {
    let table = Table::new("bench_get");
    for i in 0..10_000u64 {
        table.add(i, i, Duration::ZERO);
    }
    let mut g = c.benchmark_group("get");
    g.throughput(Throughput::Elements(1));
    g.bench_function("get_hit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7) % 10_000;
            black_box(table.get(&i)).unwrap();
        });
    });
    g.finish();
}

fn bench_load_miss(c: &mut Criterion) {
    let table = Table::new("bench_load_miss");
    table.set_loader(|key: &u64, _: &[&dyn Any]| Some(Entry::new(*key, *key * 2, Duration::ZERO)));
    let mut g = c.benchmark_group("load_miss");
    g.throughput(Throughput::Elements(1));
    g.bench_function("get_then_flush", |b| {
        b.iter(|| {
            black_box(table.get(&42)).unwrap();
            table.flush();
        });
    });
    g.finish();
}

fn bench_most_accessed(c: &mut Criterion) {
    let table = Table::new("bench_most_accessed");
    for i in 0..1_000u64 {
        table.add(i, (), Duration::ZERO);
        for _ in 0..(i % 13) {
            table.get(&i).unwrap();
        }
    }
    let mut g = c.benchmark_group("most_accessed");
    g.bench_function("top_10_of_1000", |b| {
        b.iter(|| black_box(table.most_accessed(10)));
    });
    g.finish();
}

criterion_group!(benches, bench_add, bench_get, bench_load_miss, bench_most_accessed);
criterion_main!(benches);
