//! Latency benchmarks for Herald.
//!
//! These benchmarks focus on per-message latency through the codec and
//! the topic log.

use std::sync::Arc;
use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use herald_core::{Message, TopicLog};
use herald_wire::{decode, encode, Sample};

/// Benchmark round-trip encode/decode latency.
fn bench_codec_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_roundtrip");

    let sample = Sample::new("Hello World #1", 1_700_000_000_000);

    group.bench_function("record", |b| {
        b.iter(|| {
            let record = encode(black_box(&sample));
            decode(black_box(&record)).unwrap()
        });
    });

    group.finish();
}

/// Benchmark append + cursor-read latency.
fn bench_pubsub_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("pubsub_latency");

    group.bench_function("single_cursor", |b| {
        b.iter_custom(|iters| {
            let log = Arc::new(TopicLog::with_capacity(1024));
            let mut cursor = log.cursor();

            let start = Instant::now();
            for _ in 0..iters {
                log.append(Message::new("Hello World #1"));
                let _ = cursor.try_next();
            }
            start.elapsed()
        });
    });

    group.bench_function("ten_cursors", |b| {
        b.iter_custom(|iters| {
            let log = Arc::new(TopicLog::with_capacity(1024));
            let mut cursors: Vec<_> = (0..10).map(|_| log.cursor()).collect();

            let start = Instant::now();
            for _ in 0..iters {
                log.append(Message::new("Hello World #1"));
                for cursor in &mut cursors {
                    let _ = cursor.try_next();
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmark message creation latency.
fn bench_message_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_creation");

    group.bench_function("stamped", |b| b.iter(|| Message::new(black_box("Hello World #1"))));

    group.bench_function("restamped", |b| {
        b.iter(|| Message::new(black_box("Hello World #1")).with_created_at(black_box(42)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec_roundtrip,
    bench_pubsub_latency,
    bench_message_creation,
);
criterion_main!(benches);
