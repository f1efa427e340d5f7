//! Criterion benchmarks for the hot paths.
//!
//! Benchmarks:
//! 1. Full crossover backtest over growing bar counts
//! 2. Incremental indicator updates
//! 3. Broker submit/fill cycle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{TimeZone, Utc};
use macross_core::broker::{Broker, CostModel, OrderRequest};
use macross_core::domain::{Bar, OrderSide, Symbol};
use macross_core::engine::{Engine, EngineConfig};
use macross_core::feed::{BarFeed, MemoryFeed};
use macross_core::indicators::{Atr, Ema, Rsi};
use macross_core::strategy::StrategyParams;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let mut price = 100.0_f64;
    (0..n)
        .map(|i| {
            price = (price * (1.0 + rng.gen_range(-0.02..0.02))).max(10.0);
            let open = price * (1.0 + rng.gen_range(-0.002..0.002));
            let high = open.max(price) * 1.005;
            let low = open.min(price) * 0.995;
            Bar {
                symbol: "BENCH".to_string(),
                timestamp: base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close: price,
                volume: 1_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossover_backtest");

    for &bar_count in &[1_000, 10_000, 50_000] {
        let bars = make_bars(bar_count);
        let engine = Engine::new(EngineConfig::default(), StrategyParams::default()).unwrap();

        group.bench_with_input(
            BenchmarkId::new("single_instrument", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    let feed: Box<dyn BarFeed> = Box::new(MemoryFeed::new(bars.clone()));
                    let feeds: Vec<(Symbol, Box<dyn BarFeed>)> = vec![("BENCH".into(), feed)];
                    engine.run(black_box(feeds))
                });
            },
        );
    }

    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_update");
    let bars = make_bars(10_000);

    group.bench_function("ema_atr_rsi_10k_bars", |b| {
        b.iter(|| {
            let mut ema = Ema::new(20);
            let mut atr = Atr::new(14);
            let mut rsi = Rsi::new(14);
            for bar in &bars {
                black_box(ema.update(bar.close));
                black_box(atr.update(bar));
                black_box(rsi.update(bar.close));
            }
        });
    });

    group.finish();
}

fn bench_broker(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker");
    let bars = make_bars(1_000);

    group.bench_function("submit_fill_1k_round_trips", |b| {
        b.iter(|| {
            let mut broker = Broker::new(1e9, CostModel::new(0.0005, 0.0001));
            for (i, bar) in bars.iter().enumerate() {
                let side = if i % 2 == 0 {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                };
                broker
                    .submit(OrderRequest::market("BENCH".into(), side, 1.0), i)
                    .unwrap();
                broker.fill_market_orders(bar, i + 1).unwrap();
            }
            black_box(&broker);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_full_run, bench_indicators, bench_broker);
criterion_main!(benches);
