//! 시장 레짐 분류.
//!
//! 각 봉을 중심으로 한 롤링 창(가장자리에서는 창을 안쪽으로 밀어 넣음)의
//! 정규화 회귀 기울기와 수익률 변동성으로 레짐을 판정하고, 연속 구간을
//! 세그먼트로 병합합니다.

use chart_core::{PriceSeries, RegimeConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, StageResult};
use crate::math::{linear_fit_indexed, mean, median, std_dev};

/// 시장 레짐.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    StrongBull,
    StrongBear,
    HighVolatility,
    LowVolatility,
    Sideways,
}

impl MarketRegime {
    /// 분포 출력 순서.
    pub const ALL: [MarketRegime; 5] = [
        MarketRegime::StrongBull,
        MarketRegime::StrongBear,
        MarketRegime::HighVolatility,
        MarketRegime::LowVolatility,
        MarketRegime::Sideways,
    ];
}

/// 같은 레짐이 이어진 구간.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSegment {
    pub regime: MarketRegime,
    pub start_index: usize,
    pub end_index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bars: usize,
}

/// 레짐별 비중.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeShare {
    pub regime: MarketRegime,
    pub bars: usize,
    pub fraction: f64,
}

/// 레짐 분석 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAnalysis {
    pub current: MarketRegime,
    pub segments: Vec<RegimeSegment>,
    pub distribution: Vec<RegimeShare>,
    /// 전체 위치 변동성의 중앙값
    pub median_volatility: f64,
}

/// 레짐 분류기.
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    config: RegimeConfig,
}

impl RegimeDetector {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RegimeConfig::default())
    }

    /// 위치별 (정규화 기울기, 변동성).
    fn rolling_features(&self, closes: &[f64]) -> Vec<(f64, f64)> {
        let n = closes.len();
        let window = self.config.window;
        let half = window / 2;
        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half).min(n - window);
                let segment = &closes[start..start + window];
                let level = mean(segment);
                let slope = linear_fit_indexed(segment).map(|(s, _)| s).unwrap_or(0.0);
                let normalized = if level != 0.0 { slope / level } else { 0.0 };
                let returns: Vec<f64> = segment
                    .windows(2)
                    .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
                    .collect();
                (normalized, std_dev(&returns))
            })
            .collect()
    }

    fn classify(&self, slope: f64, volatility: f64, median_volatility: f64) -> MarketRegime {
        let c = &self.config;
        if slope > c.trend_threshold && volatility < 2.0 * median_volatility {
            MarketRegime::StrongBull
        } else if slope < -c.trend_threshold && volatility < 2.0 * median_volatility {
            MarketRegime::StrongBear
        } else if volatility > c.high_volatility_ratio * median_volatility {
            MarketRegime::HighVolatility
        } else if volatility < c.low_volatility_ratio * median_volatility {
            MarketRegime::LowVolatility
        } else {
            MarketRegime::Sideways
        }
    }

    /// 시계열 전체의 레짐을 분류합니다.
    pub fn detect(&self, series: &PriceSeries) -> StageResult<RegimeAnalysis> {
        let closes = series.closes();
        let n = closes.len();
        AnalysisError::require_len(n, self.config.window.max(2))?;

        let features = self.rolling_features(&closes);
        let volatilities: Vec<f64> = features.iter().map(|&(_, v)| v).collect();
        let median_volatility = median(&volatilities);
        let regimes: Vec<MarketRegime> = features
            .iter()
            .map(|&(slope, vol)| self.classify(slope, vol, median_volatility))
            .collect();

        let mut segments: Vec<RegimeSegment> = Vec::new();
        let mut start = 0;
        for i in 1..=n {
            if i == n || regimes[i] != regimes[start] {
                let date = |idx: usize| {
                    series.date_at(idx).ok_or_else(|| {
                        AnalysisError::CalculationError(format!("레짐 인덱스 {} 범위 초과", idx))
                    })
                };
                segments.push(RegimeSegment {
                    regime: regimes[start],
                    start_index: start,
                    end_index: i - 1,
                    start_date: date(start)?,
                    end_date: date(i - 1)?,
                    bars: i - start,
                });
                start = i;
            }
        }

        let distribution = MarketRegime::ALL
            .iter()
            .map(|&regime| {
                let bars = regimes.iter().filter(|&&r| r == regime).count();
                RegimeShare {
                    regime,
                    bars,
                    fraction: bars as f64 / n as f64,
                }
            })
            .collect();

        Ok(RegimeAnalysis {
            current: regimes[n - 1],
            segments,
            distribution,
            median_volatility,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::series_from_closes;

    #[test]
    fn test_steady_uptrend_is_strong_bull() {
        // 수익률이 1.5%, 0.5% 교대로 반복 → 창별 변동성 일정
        let mut price = 100.0;
        let closes: Vec<f64> = (0..120)
            .map(|i| {
                let current = price;
                price *= if i % 2 == 0 { 1.015 } else { 1.005 };
                current
            })
            .collect();
        let analysis = RegimeDetector::with_defaults()
            .detect(&series_from_closes(&closes))
            .unwrap();
        assert_eq!(analysis.current, MarketRegime::StrongBull);
        assert_eq!(analysis.segments.len(), 1);
        assert_eq!(analysis.segments[0].bars, 120);
        assert_eq!(analysis.distribution[0].bars, 120);
    }

    #[test]
    fn test_volatility_burst_at_end() {
        let closes: Vec<f64> = (0..300)
            .map(|i| {
                let amplitude = if i < 200 { 0.1 } else { 5.0 };
                if i % 2 == 0 { 100.0 + amplitude } else { 100.0 - amplitude }
            })
            .collect();
        let analysis = RegimeDetector::with_defaults()
            .detect(&series_from_closes(&closes))
            .unwrap();
        assert_eq!(analysis.current, MarketRegime::HighVolatility);
        let sideways = analysis
            .distribution
            .iter()
            .find(|s| s.regime == MarketRegime::Sideways)
            .unwrap();
        assert!(sideways.bars > 0);
        let total: usize = analysis.segments.iter().map(|s| s.bars).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn test_short_series_insufficient() {
        let series = series_from_closes(&[100.0; 30]);
        assert_eq!(
            RegimeDetector::with_defaults().detect(&series),
            Err(AnalysisError::insufficient(50, 30))
        );
    }
}
