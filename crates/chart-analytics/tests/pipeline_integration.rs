//! 분석 파이프라인 통합 테스트
//!
//! 합성 시계열로 전체 `analyze` 흐름(평활 → 극값 → 추세선 → 패턴 →
//! 셋업 → 거래량)을 검증합니다.

use chart_analytics::{
    analyze, Bias, ChartAnalyzer, IndicatorValue, PatternKind, SectionOutcome,
};
use chart_core::{AnalysisConfig, Bar, PriceSeries};
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// 종가 배열로 일봉 시계열 생성 (시가 = 종가, 고가/저가 = 종가 ± 0.5)
fn build_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    let half = dec!(0.5);
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let close = Decimal::from_f64(close).unwrap().round_dp(6);
            Bar::new(
                start_date() + Duration::days(i as i64),
                close,
                close + half,
                close - half,
                close,
                Decimal::from(10_000 + (i % 7) as i64 * 500),
            )
        })
        .collect();
    PriceSeries::new(symbol, bars).unwrap()
}

/// 상승 추세 후 수평 저항선과 상승 지지선 사이에서 수렴하는 시계열.
///
/// 저항선 115, 지지선 90 + 0.15t 사이를 주기 40봉 사인파로 왕복합니다.
fn ascending_triangle_closes() -> Vec<f64> {
    let mut closes = Vec::with_capacity(300);
    for i in 0..150 {
        closes.push(70.0 + 32.5 * i as f64 / 150.0);
    }
    for i in 150..280 {
        let t = (i - 150) as f64;
        let resistance = 115.0;
        let support = 90.0 + 0.15 * t;
        let phase = (t * std::f64::consts::PI / 20.0).sin();
        closes.push((resistance + support) / 2.0 + phase * (resistance - support) / 2.0);
    }
    for k in 0..20 {
        closes.push(115.0 + 15.0 * (k + 1) as f64 / 20.0);
    }
    closes
}

/// 기준선 100 위의 코사인 돌기 세 개 (왼쪽 어깨, 머리, 오른쪽 어깨).
fn head_and_shoulders_closes() -> Vec<f64> {
    let bump = |t: f64, center: f64, height: f64| {
        let d = (t - center).abs();
        if d < 15.0 {
            height * 0.5 * (1.0 + (std::f64::consts::PI * d / 15.0).cos())
        } else {
            0.0
        }
    };
    (0..130)
        .map(|t| {
            let t = t as f64;
            100.0 + bump(t, 30.0, 10.0) + bump(t, 60.0, 20.0) + bump(t, 90.0, 10.3)
        })
        .collect()
}

#[test]
fn test_ascending_triangle_end_to_end() {
    let series = build_series("TRI", &ascending_triangle_closes());
    let result = analyze(&series, "TRI", None).unwrap();

    let report = result
        .patterns
        .iter()
        .find(|p| p.pattern.kind == PatternKind::AscendingTriangle)
        .expect("ascending triangle should be detected");
    assert_eq!(report.pattern.bias, Bias::Bullish);

    // 꼭짓점은 마지막 봉 이후, 형성 기간 × 1.5 이내
    match &report.pattern.geometry {
        chart_analytics::patterns::PatternGeometry::Converging { apex, .. } => {
            assert!(apex.date > series.last_date());
            assert!(apex.date <= series.last_date() + Duration::days(150));
            assert!(apex.bars_ahead > 0.0);
        }
        other => panic!("unexpected geometry: {:?}", other),
    }

    let bullish = report
        .trading_setups
        .iter()
        .find(|s| s.direction == Bias::Bullish)
        .expect("bullish setup");
    assert!(bullish.entry_trigger > 115.0);
    assert!(bullish.targets[0] > bullish.entry_trigger);
    assert!(bullish.stop_loss < bullish.entry_trigger);

    // 저항선은 평탄, 지지선은 상승
    assert_eq!(result.trendlines.resistance.len(), 1);
    assert_eq!(result.trendlines.support.len(), 1);
    assert_eq!(result.trendlines.resistance[0].touch_count, 3);
    assert!(result.trendlines.support[0].slope > 0.1);
}

#[test]
fn test_head_and_shoulders_accepted_with_all_conditions() {
    let series = build_series("HS", &head_and_shoulders_closes());
    let result = analyze(&series, "HS", None).unwrap();

    let report = result
        .patterns
        .iter()
        .find(|p| p.pattern.kind == PatternKind::HeadAndShoulders)
        .expect("head and shoulders should be detected");
    let names: Vec<&str> = report
        .pattern
        .conditions
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["head_dominance", "shoulder_symmetry", "neckline_level", "head_significance"]
    );
    assert!(report.pattern.conditions.iter().all(|c| c.passed));
    assert_eq!(report.pattern.pattern_id, "HS_0030");
    assert_eq!(report.pattern.bias, Bias::Bearish);
    assert!(report.pattern.price_target.unwrap() < 100.0);
    assert!(report.reliability.score > 0.0 && report.reliability.score <= 1.0);
}

#[test]
fn test_identical_input_produces_identical_json() {
    let series = build_series("TRI", &ascending_triangle_closes());
    let analyzer = ChartAnalyzer::new(AnalysisConfig::default()).unwrap();

    let first = serde_json::to_string(&analyzer.analyze(&series, "TRI", Some(250)).unwrap()).unwrap();
    let second = serde_json::to_string(&analyzer.analyze(&series, "TRI", Some(250)).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_short_series_indicator_markers() {
    let closes: Vec<f64> = (0..60)
        .map(|i| 100.0 + 3.0 * (i as f64 * 0.45).sin() + 0.05 * i as f64)
        .collect();
    let result = analyze(&build_series("SHORT", &closes), "SHORT", None).unwrap();

    assert!(result.indicators.shannon_entropy.is_value());
    assert!(result.indicators.fractal_dimension.is_value());
    for marker in [
        &result.indicators.hurst_exponent,
        &result.indicators.dfa_exponent,
        &result.indicators.lyapunov_exponent,
    ] {
        assert!(matches!(
            marker,
            IndicatorValue::InsufficientData { provided: 60, .. }
        ));
    }
    assert_eq!(
        result.section("indicators.hurst_exponent"),
        Some(&SectionOutcome::InsufficientData {
            required: 100,
            provided: 60
        })
    );
    assert_eq!(result.section("regimes"), Some(&SectionOutcome::Ok));
}

#[test]
fn test_rejected_attempts_carry_reasons() {
    let series = build_series("TRI", &ascending_triangle_closes());
    let result = analyze(&series, "TRI", None).unwrap();

    assert_eq!(result.summary.rejected_count, result.rejected_patterns.len());
    for rejected in &result.rejected_patterns {
        assert!(!rejected.failed.is_empty());
        assert!(rejected.reason.starts_with("Failed on: "));
        assert!(rejected.pattern_id.starts_with("FAIL_"));
    }
}

#[test]
fn test_patterns_sorted_by_reliability() {
    let series = build_series("HS", &head_and_shoulders_closes());
    let result = analyze(&series, "HS", None).unwrap();
    assert!(result
        .patterns
        .windows(2)
        .all(|w| w[0].reliability.score >= w[1].reliability.score));
    assert_eq!(
        result.summary.strongest_pattern,
        result.patterns.first().map(|p| p.pattern.pattern_id.clone())
    );
}

#[test]
fn test_volume_confirmation_for_each_accepted_pattern() {
    let series = build_series("TRI", &ascending_triangle_closes());
    let result = analyze(&series, "TRI", None).unwrap();

    assert_eq!(result.section("volume"), Some(&SectionOutcome::Ok));
    let volume = result.volume.as_ref().unwrap();
    // 7봉 주기의 규칙적인 거래량에는 2σ를 넘는 봉이 없음
    assert!(volume.anomalies.is_empty());

    let ids: Vec<&str> = volume
        .pattern_confirmations
        .iter()
        .map(|c| c.pattern_id.as_str())
        .collect();
    let expected: Vec<&str> = result
        .patterns
        .iter()
        .map(|p| p.pattern.pattern_id.as_str())
        .collect();
    assert_eq!(ids, expected);
}
