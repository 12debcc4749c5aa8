//! End-to-end throughput benchmark for the Herald mock backend.
//!
//! Measures in-process fan-out throughput: one producer blasting a topic,
//! N subscribers draining it through their own endpoints.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use herald_backend::MockHub;
use herald_core::Message;

const WARMUP_SECS: u64 = 2;
const BENCH_SECS: u64 = 10;
const LOG_CAPACITY: usize = 65_536;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let num_subscribers = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(8);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║         Herald Mock Backend Throughput Benchmark             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    run_fanout_benchmark(num_subscribers).await;
}

async fn run_fanout_benchmark(num_subscribers: usize) {
    println!("📊 Fan-out benchmark: {} subscribers", num_subscribers);
    println!("   Warmup: {}s, Measurement: {}s", WARMUP_SECS, BENCH_SECS);
    println!();

    let hub = MockHub::with_capacity("bench_topic", LOG_CAPACITY);
    let delivered = Arc::new(AtomicU64::new(0));
    let overruns = Arc::new(AtomicU64::new(0));
    let published = Arc::new(AtomicU64::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    // Spawn subscriber tasks
    let mut handles = Vec::new();
    for _ in 0..num_subscribers {
        let mut subscriber = hub.subscriber();
        let delivered = Arc::clone(&delivered);
        let overruns = Arc::clone(&overruns);
        let stop = Arc::clone(&stop);

        handles.push(tokio::spawn(async move {
            while !stop.load(Ordering::Relaxed) {
                match subscriber.recv(Duration::from_millis(10)).await {
                    Ok(Some(_)) => {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {}
                    // A lagged subscriber skipped ahead; count and go on.
                    Err(_) => {
                        overruns.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }

    // Producer task - no waiting, just blast messages
    let mut publisher = hub.publisher();
    let producer_published = Arc::clone(&published);
    let producer_stop = Arc::clone(&stop);
    let producer = tokio::spawn(async move {
        while !producer_stop.load(Ordering::Relaxed) {
            if publisher.publish(&Message::new("Hello World #0")).is_err() {
                break;
            }
            producer_published.fetch_add(1, Ordering::Relaxed);
            // Small yield to not starve the subscriber tasks
            tokio::task::yield_now().await;
        }
    });

    // Warmup phase
    println!("⏳ Warming up for {}s...", WARMUP_SECS);
    tokio::time::sleep(Duration::from_secs(WARMUP_SECS)).await;

    // Reset counters and start measurement
    delivered.store(0, Ordering::SeqCst);
    published.store(0, Ordering::SeqCst);
    overruns.store(0, Ordering::SeqCst);
    let start = Instant::now();

    println!("📈 Measuring for {}s...", BENCH_SECS);
    tokio::time::sleep(Duration::from_secs(BENCH_SECS)).await;

    let elapsed = start.elapsed();
    let total_published = published.load(Ordering::SeqCst);
    let total_delivered = delivered.load(Ordering::SeqCst);
    let total_overruns = overruns.load(Ordering::SeqCst);

    // Stop everything before reporting
    stop.store(true, Ordering::SeqCst);
    let _ = producer.await;
    for handle in handles {
        let _ = handle.await;
    }

    let delivered_per_sec = total_delivered as f64 / elapsed.as_secs_f64();
    let per_subscriber = delivered_per_sec / num_subscribers as f64;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                         RESULTS                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Subscribers:          {:>10}                            ║",
        num_subscribers
    );
    println!(
        "║  Duration:             {:>10.2}s                          ║",
        elapsed.as_secs_f64()
    );
    println!(
        "║  Published:            {:>10}                            ║",
        total_published
    );
    println!(
        "║  Delivered:            {:>10}                            ║",
        total_delivered
    );
    println!(
        "║  Throughput:           {:>10.0} msg/s                     ║",
        delivered_per_sec
    );
    println!(
        "║  Per-Subscriber:       {:>10.0} msg/s                     ║",
        per_subscriber
    );
    println!(
        "║  Overruns:             {:>10}                            ║",
        total_overruns
    );
    println!("╚══════════════════════════════════════════════════════════════╝");
}
