//! 패턴 신뢰도 점수.
//!
//! 분류기의 기본 신뢰도에 변동성, 형성 기간, 최근성, 거래량 요인을
//! 가중 합산해 0.0 ~ 1.0 점수를 만듭니다.

use chart_core::{PriceSeries, ReliabilityConfig};
use serde::{Deserialize, Serialize};

use crate::math::{mean, std_dev};
use crate::patterns::PatternRecord;

/// 점수를 구성하는 개별 요인 (각 0.0 ~ 1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityFactors {
    pub base_confidence: f64,
    /// 패턴 구간 변동성이 전체 대비 낮을수록 높음
    pub volatility: f64,
    /// 형성 기간이 길수록 높음
    pub duration: f64,
    /// 패턴이 최근에 끝났을수록 높음
    pub recency: f64,
    /// 패턴 구간 거래량 확인
    pub volume: f64,
}

/// 패턴별 신뢰도 점수.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityScore {
    pub pattern_id: String,
    pub score: f64,
    pub factors: ReliabilityFactors,
}

/// 신뢰도 계산기.
#[derive(Debug, Clone)]
pub struct ReliabilityScorer {
    config: ReliabilityConfig,
}

impl ReliabilityScorer {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ReliabilityConfig::default())
    }

    /// 단일 패턴 점수.
    pub fn score(&self, record: &PatternRecord, series: &PriceSeries) -> ReliabilityScore {
        let closes = series.closes();
        let n = closes.len();
        let range = &record.time_range;
        let end = range.end_index.min(n.saturating_sub(1));
        let start = range.start_index.min(end);

        let overall_std = std_dev(&closes);
        let volatility = if overall_std > 0.0 {
            1.0 - (std_dev(&closes[start..=end]) / overall_std).min(1.0)
        } else {
            1.0
        };
        let duration = if self.config.duration_cap == 0 {
            1.0
        } else {
            (range.bars as f64 / self.config.duration_cap as f64).min(1.0)
        };
        let recency = if n > 1 {
            end as f64 / (n - 1) as f64
        } else {
            1.0
        };
        let volume = self.volume_factor(series, start, end);

        let factors = ReliabilityFactors {
            base_confidence: record.base_confidence,
            volatility,
            duration,
            recency,
            volume,
        };
        let score = self.config.confidence_weight * factors.base_confidence
            + self.config.volatility_weight * factors.volatility
            + self.config.duration_weight * factors.duration
            + self.config.recency_weight * factors.recency
            + self.config.volume_weight * factors.volume;

        ReliabilityScore {
            pattern_id: record.pattern_id.clone(),
            score: if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 },
            factors,
        }
    }

    /// 패턴 구간 평균 거래량 / 전체 평균 거래량을 1.5배 기준으로 정규화.
    ///
    /// 확인이 꺼져 있거나 거래량 정보가 없으면 고정값을 사용합니다.
    fn volume_factor(&self, series: &PriceSeries, start: usize, end: usize) -> f64 {
        if !self.config.volume_confirmation {
            return self.config.volume_placeholder;
        }
        let volumes = series.volumes();
        let overall = mean(&volumes);
        if volumes.is_empty() || overall <= 0.0 {
            return self.config.volume_placeholder;
        }
        let ratio = mean(&volumes[start..=end]) / overall;
        (ratio / 1.5).clamp(0.0, 1.0)
    }

    /// 모든 패턴 점수. 점수 내림차순, 동점은 패턴 ID 순.
    pub fn score_all(&self, records: &[PatternRecord], series: &PriceSeries) -> Vec<ReliabilityScore> {
        let mut scores: Vec<ReliabilityScore> =
            records.iter().map(|r| self.score(r, series)).collect();
        scores.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.pattern_id.cmp(&b.pattern_id))
        });
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternGeometry, PatternKind, TimeRange};
    use crate::test_support::{series_from_closes, series_with_volume};

    fn record(series: &PriceSeries, kind: PatternKind, start: usize, end: usize, confidence: f64) -> PatternRecord {
        PatternRecord::new(
            kind,
            TimeRange::new(series, start, end).unwrap(),
            confidence,
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

    #[test]
    fn test_factor_arithmetic() {
        let closes: Vec<f64> = (0..61).map(|i| 100.0 + (i % 7) as f64).collect();
        let series = series_from_closes(&closes);
        let record = record(&series, PatternKind::DoubleTop, 30, 60, 0.9);
        let score = ReliabilityScorer::with_defaults().score(&record, &series);

        assert!((score.factors.duration - 1.0).abs() < 1e-12);
        assert!((score.factors.recency - 1.0).abs() < 1e-12);
        // 균일 거래량: 1 / 1.5
        assert!((score.factors.volume - 1.0 / 1.5).abs() < 1e-9);
        let expected = 0.4 * 0.9
            + 0.2 * score.factors.volatility
            + 0.2
            + 0.1
            + 0.1 * (1.0 / 1.5);
        assert!((score.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_volume_placeholder_when_disabled() {
        let series = series_from_closes(&[100.0; 40]);
        let record = record(&series, PatternKind::DoubleTop, 0, 9, 0.8);
        let scorer = ReliabilityScorer::new(ReliabilityConfig {
            volume_confirmation: false,
            ..Default::default()
        });
        let score = scorer.score(&record, &series);
        assert!((score.factors.volume - 0.8).abs() < 1e-12);
        // 전체 변동성 0
        assert!((score.factors.volatility - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_volume_uses_placeholder() {
        let series = series_with_volume(&[100.0; 20], &[0.0; 20]);
        let record = record(&series, PatternKind::DoubleBottom, 5, 15, 0.8);
        let score = ReliabilityScorer::with_defaults().score(&record, &series);
        assert!((score.factors.volume - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_sorted_descending_with_id_ties() {
        let series = series_from_closes(&[100.0; 40]);
        let records = vec![
            record(&series, PatternKind::DoubleTop, 0, 9, 0.5),
            record(&series, PatternKind::DoubleBottom, 0, 9, 0.5),
            record(&series, PatternKind::DoubleTop, 20, 39, 0.9),
        ];
        let scores = ReliabilityScorer::with_defaults().score_all(&records, &series);
        assert_eq!(scores[0].pattern_id, "DT_0020");
        assert_eq!(scores[1].pattern_id, "DB_0000");
        assert_eq!(scores[2].pattern_id, "DT_0000");
        assert!(scores[0].score >= scores[1].score);
    }
}
