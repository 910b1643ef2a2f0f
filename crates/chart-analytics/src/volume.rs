//! 거래량 분석.
//!
//! 최근 구간의 거래량 통계로 현재 거래량 수준과 추세를 판정하고,
//! z-score가 높은 이상 거래량 봉을 찾습니다. 채택된 패턴마다 형성 구간의
//! 전반부/후반부 거래량을 비교하여 거래량이 패턴을 뒷받침하는지 기록합니다.
//!
//! ## 판정 기준
//! - 수준: 평균 ± 표준편차 (2σ 초과 = 매우 높음)
//! - 추세: 단기 이동평균이 장기 이동평균 대비 `trend_threshold` 이상 벗어남
//! - 패턴: 수렴형(삼각형, 쐐기, 깃발)은 거래량 감소, 반전형은 후반부 증가

use chart_core::{PriceSeries, VolumeConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, StageResult};
use crate::math::{mean, sma_last, std_dev};
use crate::patterns::{PatternKind, PatternRecord};

/// 현재 거래량 수준.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeLevel {
    ExtremelyHigh,
    High,
    Normal,
    Low,
}

/// 거래량 추세.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Stable,
}

/// 패턴 유형별로 기대하는 거래량 변화.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeExpectation {
    /// 형성 중 거래량 감소 (수렴형)
    Contracting,
    /// 완성 직전 거래량 증가 (반전형)
    Expanding,
}

impl VolumeExpectation {
    pub fn for_kind(kind: PatternKind) -> Self {
        match kind {
            PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::SymmetricalTriangle
            | PatternKind::RisingWedge
            | PatternKind::FallingWedge
            | PatternKind::BullFlag
            | PatternKind::BearFlag => VolumeExpectation::Contracting,
            PatternKind::HeadAndShoulders
            | PatternKind::DoubleTop
            | PatternKind::DoubleBottom
            | PatternKind::CupAndHandle
            | PatternKind::RoundingTop
            | PatternKind::RoundingBottom => VolumeExpectation::Expanding,
        }
    }
}

/// 이상 거래량 봉.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnomaly {
    pub index: usize,
    pub date: NaiveDate,
    pub volume: f64,
    pub z_score: f64,
    /// 구간 평균 대비 배수
    pub ratio: f64,
    /// 전일 대비 종가 변화율 (첫 봉은 `None`)
    pub price_change: Option<f64>,
}

/// 패턴별 거래량 확인.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternVolume {
    pub pattern_id: String,
    pub expectation: VolumeExpectation,
    /// 형성 구간 평균 거래량
    pub average_volume: f64,
    /// 형성 구간 평균 / 전체 평균
    pub volume_ratio: f64,
    /// 후반부 평균 / 전반부 평균 (전반부 거래량이 0이거나 구간이 1봉이면 `None`)
    pub late_to_early: Option<f64>,
    pub confirmed: bool,
}

/// 거래량 분석 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    pub current_volume: f64,
    /// 최근 `lookback`봉 평균
    pub average_volume: f64,
    /// 현재 / 평균
    pub volume_ratio: f64,
    pub level: VolumeLevel,
    pub trend: VolumeTrend,
    pub short_average: f64,
    pub long_average: f64,
    /// 시간 오름차순
    pub anomalies: Vec<VolumeAnomaly>,
    pub pattern_confirmations: Vec<PatternVolume>,
}

/// 거래량 분석기.
#[derive(Debug, Clone)]
pub struct VolumeAnalyzer {
    config: VolumeConfig,
}

impl VolumeAnalyzer {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(VolumeConfig::default())
    }

    /// 시계열 거래량을 분석하고 패턴별 확인 결과를 붙입니다.
    pub fn analyze<'a, I>(&self, series: &PriceSeries, patterns: I) -> StageResult<VolumeAnalysis>
    where
        I: IntoIterator<Item = &'a PatternRecord>,
    {
        let c = &self.config;
        let volumes = series.volumes();
        let n = volumes.len();
        AnalysisError::require_len(n, c.long_period)?;

        let overall = mean(&volumes);
        if overall <= 0.0 {
            return Err(AnalysisError::Degenerate("거래량이 모두 0입니다".into()));
        }

        let start = n.saturating_sub(c.lookback);
        let recent = &volumes[start..];
        let average = mean(recent);
        let std = std_dev(recent);
        let current = volumes[n - 1];

        let short_average = sma_last(&volumes, c.short_period).unwrap_or(average);
        let long_average = sma_last(&volumes, c.long_period).unwrap_or(average);

        let closes = series.closes();
        let anomalies: Vec<VolumeAnomaly> = if std > 0.0 {
            (start..n)
                .filter_map(|index| {
                    let z_score = (volumes[index] - average) / std;
                    (z_score > c.anomaly_z_score).then(|| VolumeAnomaly {
                        index,
                        date: series.bars()[index].date,
                        volume: volumes[index],
                        z_score,
                        ratio: safe_div(volumes[index], average),
                        price_change: index
                            .checked_sub(1)
                            .filter(|&prev| closes[prev] != 0.0)
                            .map(|prev| (closes[index] - closes[prev]) / closes[prev]),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let pattern_confirmations: Vec<PatternVolume> = patterns
            .into_iter()
            .map(|pattern| self.confirm(pattern, &volumes, overall))
            .collect();

        debug!(
            current,
            average,
            anomalies = anomalies.len(),
            confirmed = pattern_confirmations.iter().filter(|p| p.confirmed).count(),
            "Volume analyzed"
        );

        Ok(VolumeAnalysis {
            current_volume: current,
            average_volume: average,
            volume_ratio: safe_div(current, average),
            level: classify_level(current, average, std),
            trend: self.classify_trend(short_average, long_average),
            short_average,
            long_average,
            anomalies,
            pattern_confirmations,
        })
    }

    fn classify_trend(&self, short_average: f64, long_average: f64) -> VolumeTrend {
        let t = self.config.trend_threshold;
        if short_average > long_average * (1.0 + t) {
            VolumeTrend::Increasing
        } else if short_average < long_average * (1.0 - t) {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Stable
        }
    }

    fn confirm(&self, pattern: &PatternRecord, volumes: &[f64], overall: f64) -> PatternVolume {
        let range = &pattern.time_range;
        let end = range.end_index.min(volumes.len() - 1);
        let segment = &volumes[range.start_index.min(end)..=end];
        let average_volume = mean(segment);

        let late_to_early = if segment.len() >= 2 {
            let (early, late) = segment.split_at(segment.len() / 2);
            let early = mean(early);
            (early > 0.0).then(|| mean(late) / early)
        } else {
            None
        };

        let expectation = VolumeExpectation::for_kind(pattern.kind);
        let confirmed = match (expectation, late_to_early) {
            (VolumeExpectation::Contracting, Some(ratio)) => ratio < 1.0,
            (VolumeExpectation::Expanding, Some(ratio)) => ratio >= self.config.confirmation_ratio,
            (_, None) => false,
        };

        PatternVolume {
            pattern_id: pattern.pattern_id.clone(),
            expectation,
            average_volume,
            volume_ratio: safe_div(average_volume, overall),
            late_to_early,
            confirmed,
        }
    }
}

fn classify_level(current: f64, average: f64, std: f64) -> VolumeLevel {
    if current > average + 2.0 * std {
        VolumeLevel::ExtremelyHigh
    } else if current > average + std {
        VolumeLevel::High
    } else if current < average - std {
        VolumeLevel::Low
    } else {
        VolumeLevel::Normal
    }
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

// ==================== 테스트 ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternGeometry, TimeRange};
    use crate::test_support::{series_from_closes, series_with_volume};

    fn record(series: &PriceSeries, kind: PatternKind, start: usize, end: usize) -> PatternRecord {
        PatternRecord::new(
            kind,
            TimeRange::new(series, start, end).unwrap(),
            0.8,
            vec![],
            vec![],
            PatternGeometry::DoubleExtremum {
                first_price: 1.0,
                second_price: 1.0,
                intervening_price: 1.0,
                price_gap: 0.0,
                depth: 0.0,
            },
            None,
        )
    }

    fn analyze_alone(series: &PriceSeries) -> StageResult<VolumeAnalysis> {
        VolumeAnalyzer::with_defaults().analyze(series, std::iter::empty())
    }

    #[test]
    fn test_single_spike_is_anomaly() {
        let mut volumes = vec![1000.0; 30];
        volumes[25] = 5000.0;
        let mut closes = vec![100.0; 30];
        closes[25] = 104.0;
        let series = series_with_volume(&closes, &volumes);

        let analysis = analyze_alone(&series).unwrap();

        assert_eq!(analysis.anomalies.len(), 1);
        let spike = &analysis.anomalies[0];
        assert_eq!(spike.index, 25);
        assert!(spike.z_score > 5.0);
        assert!((spike.price_change.unwrap() - 0.04).abs() < 1e-9);
        assert_eq!(analysis.level, VolumeLevel::Normal);
    }

    #[test]
    fn test_rising_volume_is_increasing_and_high() {
        let volumes: Vec<f64> = (0..30).map(|i| if i < 20 { 1000.0 } else { 2000.0 }).collect();
        let series = series_with_volume(&[100.0; 30], &volumes);

        let analysis = analyze_alone(&series).unwrap();

        assert_eq!(analysis.trend, VolumeTrend::Increasing);
        assert_eq!(analysis.level, VolumeLevel::High);
        assert!((analysis.short_average - 2000.0).abs() < 1e-9);
        assert!((analysis.long_average - 1500.0).abs() < 1e-9);
        assert!((analysis.volume_ratio - 1.5).abs() < 1e-9);
        assert!(analysis.anomalies.is_empty());
    }

    #[test]
    fn test_fading_volume_is_decreasing() {
        let volumes: Vec<f64> = (0..30).map(|i| if i < 16 { 2000.0 } else { 1000.0 }).collect();
        let series = series_with_volume(&[100.0; 30], &volumes);

        let analysis = analyze_alone(&series).unwrap();
        assert_eq!(analysis.trend, VolumeTrend::Decreasing);
        assert_eq!(analysis.level, VolumeLevel::Low);
    }

    #[test]
    fn test_flat_volume_is_stable_without_anomalies() {
        let series = series_from_closes(&[100.0; 40]);
        let analysis = analyze_alone(&series).unwrap();

        assert_eq!(analysis.trend, VolumeTrend::Stable);
        assert_eq!(analysis.level, VolumeLevel::Normal);
        assert!(analysis.anomalies.is_empty());
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let series = series_from_closes(&[100.0; 12]);
        assert_eq!(
            analyze_alone(&series),
            Err(AnalysisError::InsufficientData {
                required: 20,
                provided: 12
            })
        );
    }

    #[test]
    fn test_zero_volume_is_degenerate() {
        let series = series_with_volume(&[100.0; 30], &[0.0; 30]);
        assert!(matches!(
            analyze_alone(&series),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_pattern_confirmation_follows_expectation() {
        // 0..20 구간: 전반부 2000, 후반부 1000 / 20..40 구간: 전반부 1000, 후반부 3000
        let volumes: Vec<f64> = (0..40)
            .map(|i| match i {
                0..=9 => 2000.0,
                10..=29 => 1000.0,
                _ => 3000.0,
            })
            .collect();
        let series = series_with_volume(&[100.0; 40], &volumes);
        let patterns = vec![
            record(&series, PatternKind::SymmetricalTriangle, 0, 19),
            record(&series, PatternKind::DoubleBottom, 20, 39),
            record(&series, PatternKind::BullFlag, 20, 39),
        ];

        let analysis = VolumeAnalyzer::with_defaults().analyze(&series, &patterns).unwrap();
        let checks = &analysis.pattern_confirmations;
        assert_eq!(checks.len(), 3);

        assert_eq!(checks[0].expectation, VolumeExpectation::Contracting);
        assert!((checks[0].late_to_early.unwrap() - 0.5).abs() < 1e-9);
        assert!(checks[0].confirmed);

        assert_eq!(checks[1].expectation, VolumeExpectation::Expanding);
        assert!((checks[1].late_to_early.unwrap() - 3.0).abs() < 1e-9);
        assert!(checks[1].confirmed);
        assert!((checks[1].volume_ratio - 2000.0 / 1750.0).abs() < 1e-9);

        assert!(!checks[2].confirmed);
    }

    #[test]
    fn test_single_bar_pattern_is_unconfirmed() {
        let series = series_from_closes(&[100.0; 30]);
        let patterns = vec![record(&series, PatternKind::CupAndHandle, 10, 10)];

        let analysis = VolumeAnalyzer::with_defaults().analyze(&series, &patterns).unwrap();
        assert_eq!(analysis.pattern_confirmations[0].late_to_early, None);
        assert!(!analysis.pattern_confirmations[0].confirmed);
    }
}
