//! 분석 파이프라인 벤치마크.

use chart_analytics::{ChartAnalyzer, IndicatorBattery};
use chart_core::{Bar, IndicatorConfig, PriceSeries};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

fn synthetic_series(len: usize) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(2024);
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut price = 100.0;
    let bars = (0..len)
        .map(|i| {
            price = (price + rng.gen_range(-1.5..1.6)).max(5.0);
            let close = Decimal::from_f64(price).unwrap().round_dp(4);
            let spread = Decimal::from_f64(rng.gen_range(0.1..1.0)).unwrap().round_dp(4);
            Bar::new(
                start + Duration::days(i as i64),
                close,
                close + spread,
                close - spread,
                close,
                Decimal::from(rng.gen_range(1_000..50_000)),
            )
        })
        .collect();
    PriceSeries::new("BENCH", bars).unwrap()
}

fn bench_analyze(c: &mut Criterion) {
    let analyzer = ChartAnalyzer::with_defaults();
    let mut group = c.benchmark_group("analyze");
    for len in [150usize, 300, 600] {
        let series = synthetic_series(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &series, |b, series| {
            b.iter(|| analyzer.analyze(black_box(series), "BENCH", None).unwrap())
        });
    }
    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let closes = synthetic_series(500).closes();
    let battery = IndicatorBattery::new(IndicatorConfig::default());
    c.bench_function("indicator_battery_500", |b| {
        b.iter(|| battery.compute(black_box(&closes)))
    });
}

criterion_group!(benches, bench_analyze, bench_indicators);
criterion_main!(benches);
