//! Delivery queue benchmark suite.
//!
//! Benchmarks push throughput at different dedup window sizes:
//! - Window sizes: 0 (disabled), 256 (default), 4096
//! - Redelivery ratios: none, every fourth record
//!
//! Run with: cargo bench --bench delivery_queue
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use notify_channel::{DeliveryQueue, NotificationRecord, parse_notification};
use serde_json::Value;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const WINDOW_SIZES: &[usize] = &[0, 256, 4096];
const BATCH: u64 = 10_000;
const SUBSCRIBERS: usize = 4;

// ============================================================================
// Benchmark: Push Throughput
// ============================================================================

fn bench_push(c: &mut Criterion) {
    let fresh = records(BATCH, 1);
    let redelivered = records(BATCH, 4);

    let mut group = c.benchmark_group("push");
    group.throughput(Throughput::Elements(BATCH));

    for &window in WINDOW_SIZES {
        for (label, batch) in [("fresh", &fresh), ("redelivered", &redelivered)] {
            group.bench_with_input(
                BenchmarkId::new(label, window),
                batch,
                |b, batch| {
                    b.iter_batched(
                        || (queue(window), batch.clone()),
                        |(mut queue, batch)| {
                            for record in batch {
                                black_box(queue.push(record));
                            }
                        },
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: Parse
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let frame = r#"{"id":123456,"message":"Your order has shipped","kind":"order"}"#;

    c.bench_function("parse_notification", |b| {
        b.iter(|| parse_notification(black_box(frame)));
    });
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds `count` records; every `repeat_every`th record repeats an earlier ID.
fn records(count: u64, repeat_every: u64) -> Vec<NotificationRecord> {
    (0..count)
        .map(|n| {
            let id = if repeat_every > 1 && n % repeat_every == 0 {
                n / 2
            } else {
                n
            };
            NotificationRecord::new(id, format!("note {n}"), Value::Null)
        })
        .collect()
}

fn queue(window: usize) -> DeliveryQueue {
    let queue = DeliveryQueue::new(window);
    let sink = Arc::new(AtomicU64::new(0));

    for _ in 0..SUBSCRIBERS {
        let sink = Arc::clone(&sink);
        queue.subscribe(move |record| {
            sink.fetch_add(record.message().len() as u64, Ordering::Relaxed);
        });
    }

    queue
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_push, bench_parse);
criterion_main!(benches);
