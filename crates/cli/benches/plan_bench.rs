use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use record::Record;
use shard::{plan, ShardOptions, ShardedCollection};
use std::collections::BTreeMap;
use store::{Context, DirStore, MemoryStore};
use tempfile::tempdir;

const N_BLOBS: usize = 10_000;
const VALUE_SIZE: usize = 1_000;
const CAPACITY: usize = 100_000;

fn template() -> Record {
    Record::new("bench", "blobs").with_label("app", "bench")
}

fn build_blobs() -> BTreeMap<String, Vec<u8>> {
    (0..N_BLOBS)
        .map(|i| (format!("blob-{:05}", i), vec![b'x'; VALUE_SIZE]))
        .collect()
}

fn options() -> ShardOptions {
    ShardOptions {
        capacity: CAPACITY,
        ..ShardOptions::default()
    }
}

fn plan_benchmark(c: &mut Criterion) {
    let blobs = build_blobs();
    let tpl = template();

    c.bench_function("plan_10k_blobs", |b| {
        b.iter(|| plan(&blobs, &tpl, CAPACITY));
    });
}

fn memory_pass_benchmark(c: &mut Criterion) {
    let blobs = build_blobs();

    c.bench_function("reconcile_memory_10k_blobs", |b| {
        b.iter_batched(
            || {
                let mut coll = ShardedCollection::with_options(template(), options()).unwrap();
                coll.extend(blobs.clone());
                (MemoryStore::default(), coll)
            },
            |(store, mut coll)| {
                coll.synchronize_and_reclaim(&Context::background(), &store)
                    .unwrap();
            },
            BatchSize::LargeInput,
        );
    });
}

fn unchanged_resync_benchmark(c: &mut Criterion) {
    let blobs = build_blobs();
    let store = MemoryStore::default();
    let mut first = ShardedCollection::with_options(template(), options()).unwrap();
    first.extend(blobs.clone());
    first
        .synchronize_and_reclaim(&Context::background(), &store)
        .unwrap();

    c.bench_function("resync_unchanged_memory_10k_blobs", |b| {
        b.iter_batched(
            || {
                let mut coll = ShardedCollection::with_options(template(), options()).unwrap();
                coll.extend(blobs.clone());
                coll
            },
            |mut coll| {
                coll.synchronize_and_reclaim(&Context::background(), &store)
                    .unwrap();
            },
            BatchSize::LargeInput,
        );
    });
}

fn dir_pass_benchmark(c: &mut Criterion) {
    let blobs = build_blobs();

    c.bench_function("reconcile_dir_10k_blobs_nosync", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let store = DirStore::open(dir.path(), 1024 * 1024, false).unwrap();
                let mut coll = ShardedCollection::with_options(template(), options()).unwrap();
                coll.extend(blobs.clone());
                (dir, store, coll)
            },
            |(_dir, store, mut coll)| {
                coll.synchronize_and_reclaim(&Context::background(), &store)
                    .unwrap();
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    plan_benchmark,
    memory_pass_benchmark,
    unchanged_resync_benchmark,
    dir_pass_benchmark
);
criterion_main!(benches);
