// ============================================================================
// Matching Engine Benchmarks
// ============================================================================
//
// Benchmark Categories:
// 1. Full Matching - End-to-end order matching through the engine
// 2. Book Depth - Sweeping several levels of a deep book
// 3. Pipeline - SPSC queue round trip and bus publish/poll
//
// Every engine benchmark keeps the book at a steady size so iterations are
// comparable: each matched order is replaced before the next one crosses.
// ============================================================================

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;
use tick_matching_engine::pipeline::{bus, queue};
use tick_matching_engine::prelude::*;

fn engine() -> MatchingEngine<NoOpEventSink> {
    MatchingEngineBuilder::new("BTC-USD")
        .build(NoOpEventSink)
        .expect("valid benchmark config")
}

// ============================================================================
// Full Matching Engine Benchmarks
// ============================================================================

fn benchmark_price_time_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("price_time_matching");

    for resting in [100u64, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(resting),
            resting,
            |b, &resting| {
                let mut engine = engine();

                // Pre-populate the book with one sell per price level
                for i in 0..resting {
                    engine
                        .process(Order::limit(i + 1, Side::Sell, 50_000 + i as i64, 1))
                        .unwrap();
                }

                let mut next_id = resting + 1;
                b.iter(|| {
                    // Lift the best ask, then put it back
                    let buy = Order::limit(next_id, Side::Buy, 50_000, 1);
                    let sell = Order::limit(next_id + 1, Side::Sell, 50_000, 1);
                    next_id += 2;
                    black_box(engine.process(buy).unwrap());
                    black_box(engine.process(sell).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn benchmark_no_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("no_match");

    group.bench_function("rest_and_cancel", |b| {
        let mut engine = engine();
        for i in 0..1_000u64 {
            engine
                .process(Order::limit(i + 1, Side::Sell, 60_000 + i as i64, 1))
                .unwrap();
        }

        let mut next_id = 10_000u64;
        b.iter(|| {
            // Below every ask, so it rests without trading
            let id = next_id;
            next_id += 1;
            black_box(engine.process(Order::limit(id, Side::Buy, 50_000, 1)).unwrap());
            black_box(engine.cancel(OrderId(id)).unwrap());
        });
    });

    group.finish();
}

// ============================================================================
// Book Depth Benchmarks
// ============================================================================

fn benchmark_sweep_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_levels");

    for levels in [1i64, 5, 25].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(levels), levels, |b, &levels| {
            b.iter_batched(
                || {
                    let mut engine = engine();
                    for i in 0..levels {
                        engine
                            .process(Order::limit(i as u64 + 1, Side::Sell, 50_000 + i * 10, 2))
                            .unwrap();
                    }
                    engine
                },
                |mut engine| {
                    let sweep = Order::market(1_000_000, Side::Buy, levels * 2);
                    black_box(engine.process(sweep).unwrap())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_stop_cascade(c: &mut Criterion) {
    c.bench_function("stop_cascade_10", |b| {
        b.iter_batched(
            || {
                let mut engine = engine();
                for i in 0..20u64 {
                    engine
                        .process(Order::limit(i + 1, Side::Buy, 50_000 - i as i64, 1))
                        .unwrap();
                }
                for i in 0..10u64 {
                    let stop = Order::limit(100 + i, Side::Sell, 49_990, 1)
                        .with_type(OrderType::StopLoss);
                    engine.process(stop).unwrap();
                }
                engine
            },
            |mut engine| black_box(engine.process(Order::market(999, Side::Sell, 1)).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn benchmark_queue_round_trip(c: &mut Criterion) {
    let (mut producer, mut consumer) = queue::bounded::<Order>(1024);
    let order = Order::limit(1, Side::Buy, 50_000, 1);

    c.bench_function("spsc_push_pop", |b| {
        b.iter(|| {
            producer.push(black_box(order.clone())).unwrap();
            black_box(consumer.pop())
        });
    });
}

fn benchmark_bus_publish_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus");
    let trade = Trade::new(OrderId(2), OrderId(1), Price::new(50_000), Quantity::new(1));

    for subscribers in [1usize, 4].iter() {
        group.bench_with_input(
            BenchmarkId::new("publish_poll", subscribers),
            subscribers,
            |b, &subscribers| {
                let (mut publisher, handle) = bus::channel::<MarketEvent>(1024);
                let mut readers: Vec<_> = (0..subscribers).map(|_| handle.subscribe()).collect();

                b.iter(|| {
                    publisher.publish(MarketEvent::Trade(trade));
                    for reader in readers.iter_mut() {
                        black_box(reader.poll());
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_price_time_matching,
    benchmark_no_match,
    benchmark_sweep_levels,
    benchmark_stop_cascade,
    benchmark_queue_round_trip,
    benchmark_bus_publish_poll,
);

criterion_main!(benches);
