//! Performance benchmarks for the per-session tag registry.
//!
//! Continuous inventory can report the same tag many times per second, so the
//! duplicate check sits on the hottest path of a batch scan.
//!
//! # Run Benchmarks
//!
//! ```sh
//! cargo bench -p rfidkit-engine --bench registry_bench
//!
//! # Only the duplicate-sighting group
//! cargo bench -p rfidkit-engine --bench registry_bench -- duplicate
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rfidkit_core::{MemoryBank, TagRecord, WriteRequest};
use rfidkit_engine::TagRegistry;
use std::hint::black_box;

fn tags(count: usize) -> Vec<TagRecord> {
    (0..count)
        .map(|i| TagRecord::new(format!("3000E28011{:014X}", i)).unwrap())
        .collect()
}

/// Insert distinct tags into an empty registry.
fn bench_insert_distinct(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_insert_distinct");

    for count in [10usize, 100, 1_000] {
        let batch = tags(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &batch, |b, batch| {
            b.iter(|| {
                let mut registry = TagRegistry::new();
                for tag in batch {
                    black_box(registry.insert(tag.clone()));
                }
                registry
            });
        });
    }

    group.finish();
}

/// Re-report tags that are already registered.
fn bench_duplicate_sightings(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_duplicate_sightings");
    group.throughput(Throughput::Elements(1));

    for count in [10usize, 1_000] {
        let batch = tags(count);
        let mut registry = TagRegistry::new();
        for tag in &batch {
            registry.insert(tag.clone());
        }
        let needle = &batch[count / 2].epc;

        group.bench_with_input(BenchmarkId::new("contains", count), needle, |b, epc| {
            b.iter(|| black_box(registry.contains(black_box(epc))));
        });
    }

    group.finish();
}

/// Snapshot cost for the batch-scan result.
fn bench_snapshot(c: &mut Criterion) {
    let mut registry = TagRegistry::new();
    for tag in tags(500) {
        registry.insert(tag);
    }

    c.bench_function("registry_snapshot_500", |b| {
        b.iter(|| black_box(registry.snapshot()));
    });
}

/// Chunk planning for payloads around the chunking threshold.
fn bench_chunk_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_chunk_plan");

    for words in [32usize, 50, 256] {
        let request = WriteRequest::new(MemoryBank::User, 0, "A".repeat(words * 4), "00000000");
        group.bench_with_input(BenchmarkId::from_parameter(words), &request, |b, request| {
            b.iter(|| black_box(request.chunk_plan()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_distinct,
    bench_duplicate_sightings,
    bench_snapshot,
    bench_chunk_plan
);
criterion_main!(benches);
