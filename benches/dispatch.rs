//! Delivery-path benchmarks for element-monitor.
//!
//! - Duplicate suppression cost per event
//! - Cost of a reported change including the callback
//! - Duplicate suppression with concurrent delivery threads

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use element_monitor::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const TARGET: EntityRef = EntityRef::new(12, 34);

fn started(counter: Arc<AtomicU64>) -> (Arc<InMemoryRegistry>, ElementStateMonitor) {
    let registry = Arc::new(InMemoryRegistry::new());
    let monitor = ElementStateMonitor::builder(registry.clone(), LocalConnection::shared("bench"))
        .source_id("bench")
        .selection(TARGET)
        .build()
        .unwrap();
    monitor
        .start(move |change| {
            black_box(change.state());
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    (registry, monitor)
}

fn tagged(monitor: &ElementStateMonitor, state: ElementState) -> RawEvent {
    RawEvent::new(
        monitor.set_id(),
        Payload::ElementState(ElementStateEvent::new(TARGET, state, true)),
    )
}

/// Benchmark a repeated state that is suppressed
fn benchmark_duplicate(c: &mut Criterion) {
    let (_registry, monitor) = started(Arc::new(AtomicU64::new(0)));
    let handle = monitor.handle().unwrap();
    let conn = LocalConnection::shared("bench");
    let event = tagged(&monitor, ElementState::Active);
    handle.deliver(&conn, &event);

    let mut group = c.benchmark_group("duplicate");
    group.bench_function("handle_deliver", |b| {
        b.iter(|| handle.deliver(&conn, black_box(&event)));
    });
    group.finish();
}

/// Benchmark alternating states, each one reported
fn benchmark_change(c: &mut Criterion) {
    let (registry, monitor) = started(Arc::new(AtomicU64::new(0)));
    let handle = monitor.handle().unwrap();
    let conn = LocalConnection::shared("bench");
    let events = [
        tagged(&monitor, ElementState::Active),
        tagged(&monitor, ElementState::Paused),
    ];

    let mut group = c.benchmark_group("change");
    group.bench_function("handle_deliver", |b| {
        let mut i = 0usize;
        b.iter(|| {
            handle.deliver(&conn, black_box(&events[i & 1]));
            i += 1;
            // Keep the pending queue from filling up.
            while handle.try_next().is_some() {}
        });
    });
    group.bench_function("registry_deliver", |b| {
        let states = [ElementState::Hidden, ElementState::Paused];
        let mut i = 0usize;
        b.iter(|| {
            registry.deliver(&conn, &ElementStateEvent::new(TARGET, states[i & 1], true));
            i += 1;
            while handle.try_next().is_some() {}
        });
    });
    group.finish();
}

/// Benchmark duplicate suppression with varying delivery threads
fn benchmark_concurrent_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_duplicates");

    for num_threads in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let (_registry, monitor) = started(Arc::new(AtomicU64::new(0)));
                let handle = monitor.handle().unwrap();
                let event = tagged(&monitor, ElementState::Active);
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let workers: Vec<_> = (0..num_threads)
                        .map(|_| {
                            let handle = Arc::clone(&handle);
                            let event = event.clone();
                            let barrier = Arc::clone(&barrier);
                            thread::spawn(move || {
                                let conn = LocalConnection::shared("bench");
                                barrier.wait();
                                let start = std::time::Instant::now();
                                for _ in 0..iters {
                                    handle.deliver(&conn, &event);
                                }
                                start.elapsed()
                            })
                        })
                        .collect();

                    barrier.wait();
                    let total: Duration = workers.into_iter().map(|w| w.join().unwrap()).sum();
                    while handle.try_next().is_some() {}
                    total / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_duplicate,
    benchmark_change,
    benchmark_concurrent_duplicates
);
criterion_main!(benches);
