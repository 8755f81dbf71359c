//! Throughput benchmarks for matching engine operations.
//!
//! Measures the core paths:
//! - Order submission (resting and matching)
//! - Cancellation
//! - Market-order sweeps
//! - Book queries (top of book, depth)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickbook::{MatchingEngine, Order, OrderId, Price, Side, TimeInForce};

/// Build an engine with N price levels on each side, one order per level.
fn build_engine(levels: usize) -> MatchingEngine {
    let mut engine = MatchingEngine::new();

    for i in 0..levels {
        let bid_price = Price(990_000 - (i as i64) * 10_000);
        engine.submit(Order::limit(
            OrderId(i as i32 + 1),
            Side::Buy,
            bid_price,
            100,
            TimeInForce::Gtc,
        ));

        let ask_price = Price(1_010_000 + (i as i64) * 10_000);
        engine.submit(Order::limit(
            OrderId(levels as i32 + i as i32 + 1),
            Side::Sell,
            ask_price,
            100,
            TimeInForce::Gtc,
        ));
    }

    engine
}

/// Submit limit orders that rest without matching.
fn bench_submit_no_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_no_match");

    for levels in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, &levels| {
            let mut engine = build_engine(levels);
            let mut next_id = 1_000_000;
            let mut price_offset = 0i64;

            b.iter(|| {
                // Bid far below the best bid so nothing matches
                let price = Price(500_000 - price_offset);
                price_offset = (price_offset + 1) % 10_000;
                next_id += 1;
                black_box(engine.submit(Order::limit(
                    OrderId(next_id),
                    Side::Buy,
                    price,
                    100,
                    TimeInForce::Gtc,
                )))
            });
        });
    }

    group.finish();
}

/// Submit a limit order that fully matches one resting order.
fn bench_submit_with_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_with_match");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_fill", |b| {
        b.iter_batched(
            || {
                let mut engine = MatchingEngine::new();
                engine.submit(Order::limit(
                    OrderId(1),
                    Side::Sell,
                    Price(1_000_000),
                    100,
                    TimeInForce::Gtc,
                ));
                engine
            },
            |mut engine| {
                black_box(engine.submit(Order::limit(
                    OrderId(2),
                    Side::Buy,
                    Price(1_000_000),
                    100,
                    TimeInForce::Gtc,
                )))
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Market order sweeping through multiple levels.
fn bench_market_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_sweep");
    group.throughput(Throughput::Elements(1));

    for levels in [5usize, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, &levels| {
            b.iter_batched(
                || build_engine(levels),
                |mut engine| {
                    black_box(
                        engine.submit(Order::market(OrderId(999_999), Side::Buy, levels as i32 * 100)),
                    )
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Cancel a resting order.
fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");
    group.throughput(Throughput::Elements(1));

    group.bench_function("resting_order", |b| {
        b.iter_batched(
            || build_engine(100),
            |mut engine| black_box(engine.cancel(OrderId(50))),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Book queries against a populated engine.
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let engine = build_engine(1000);

    group.throughput(Throughput::Elements(1));
    group.bench_function("top_of_book", |b| {
        b.iter(|| black_box(engine.top_of_book()));
    });
    group.bench_function("depth_10", |b| {
        b.iter(|| black_box(engine.depth(10)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_submit_no_match,
    bench_submit_with_match,
    bench_market_sweep,
    bench_cancel,
    bench_queries
);
criterion_main!(benches);
