//! 단위 테스트용 시계열 생성 헬퍼.

use chart_core::{Bar, PriceSeries};
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap().round_dp(6)
}

/// 종가 배열로 시계열을 만듭니다. 고가/저가는 종가 ±0.5, 날짜는 연속된 달력일.
pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    series_with_volume(closes, &vec![1000.0; closes.len()])
}

pub fn series_with_volume(closes: &[f64], volumes: &[f64]) -> PriceSeries {
    build(closes, volumes, 0.5)
}

/// 고가/저가를 종가 ±`half_range`로 둔 시계열.
pub fn series_with_range(closes: &[f64], half_range: f64) -> PriceSeries {
    build(closes, &vec![1000.0; closes.len()], half_range)
}

fn build(closes: &[f64], volumes: &[f64], half_range: f64) -> PriceSeries {
    let spread = decimal(half_range);
    let bars = closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let close = decimal(close);
            Bar::new(
                start_date() + Duration::days(i as i64),
                close,
                close + spread,
                close - spread,
                close,
                decimal(volume),
            )
        })
        .collect();
    PriceSeries::new("TEST", bars).unwrap()
}
