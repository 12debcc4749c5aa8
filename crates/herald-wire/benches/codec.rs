//! Codec benchmarks for herald-wire.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use herald_wire::{codec, Sample};

fn bench_encode(c: &mut Criterion) {
    let sample = Sample::new("Hello World #1", 1_700_000_000_000);

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(codec::SAMPLE_RECORD_SIZE as u64));
    group.bench_function("short", |b| b.iter(|| codec::encode(black_box(&sample))));
    group.finish();
}

fn bench_encode_full(c: &mut Criterion) {
    let sample = Sample::new("x".repeat(codec::MAX_CONTENT_LENGTH), 1_700_000_000_000);

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(codec::SAMPLE_RECORD_SIZE as u64));
    group.bench_function("full_255B", |b| {
        b.iter(|| codec::encode(black_box(&sample)))
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let sample = Sample::new("Hello World #1", 1_700_000_000_000);
    let record = codec::encode(&sample);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(record.len() as u64));
    group.bench_function("short", |b| b.iter(|| codec::decode(black_box(&record))));
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let sample = Sample::new("Hello World #1", 1_700_000_000_000);

    c.bench_function("roundtrip", |b| {
        b.iter(|| {
            let record = codec::encode(black_box(&sample));
            codec::decode(black_box(&record)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_encode_full,
    bench_decode,
    bench_roundtrip
);
criterion_main!(benches);
