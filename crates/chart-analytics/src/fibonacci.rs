//! 피보나치 되돌림/확장 레벨.
//!
//! 추세 방향을 판정한 뒤 최근 봉에서 거꾸로 스윙 저점/고점 한 쌍을 고르고,
//! 저점을 0%, 고점을 100%로 하는 레벨을 계산합니다. 앵커 방향은 추세와
//! 무관하게 고정이며 추세는 표시용 라벨로만 쓰입니다.

use chart_core::{FibonacciConfig, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, StageResult};
use crate::math::{max_of, min_of, sma_last};

/// 되돌림 비율.
pub const RETRACEMENT_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// 확장 비율 (100% 레벨 너머로 투영).
pub const EXTENSION_RATIOS: [f64; 5] = [1.272, 1.414, 1.618, 2.0, 2.618];

/// 추세 방향 (표시용).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
}

/// 레벨 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Retracement,
    Extension,
}

/// 피보나치 가격 레벨.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    /// 예: "Retracement 61.8%"
    pub label: String,
    pub kind: LevelKind,
    pub ratio: f64,
    pub price: f64,
    /// 레벨 가격 - 현재가
    pub distance: f64,
    /// |거리| / 현재가 × 100
    pub distance_percent: f64,
}

/// 스윙 앵커.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingAnchor {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
}

/// 피보나치 분석 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciAnalysis {
    pub trend_direction: TrendDirection,
    pub swing_high: SwingAnchor,
    pub swing_low: SwingAnchor,
    pub price_range: f64,
    /// 현재 봉을 스윙 앵커로 사용했는지
    pub used_current_bar: bool,
    /// 현재가와의 거리 순
    pub levels: Vec<FibonacciLevel>,
    pub nearest_level: Option<FibonacciLevel>,
}

/// 스윙 저점/고점과 현재가로 레벨을 계산합니다.
///
/// 범위가 0 이하이면 `Degenerate`를 반환합니다.
pub fn compute_levels(swing_low: f64, swing_high: f64, current: f64) -> StageResult<Vec<FibonacciLevel>> {
    let range = swing_high - swing_low;
    if range.is_nan() || range <= 0.0 {
        return Err(AnalysisError::Degenerate(format!(
            "스윙 고점({})이 저점({})보다 높아야 합니다",
            swing_high, swing_low
        )));
    }

    let level = |kind: LevelKind, ratio: f64, price: f64| {
        let prefix = match kind {
            LevelKind::Retracement => "Retracement",
            LevelKind::Extension => "Extension",
        };
        let distance = price - current;
        FibonacciLevel {
            label: format!("{} {:.1}%", prefix, ratio * 100.0),
            kind,
            ratio,
            price,
            distance,
            distance_percent: if current != 0.0 {
                distance.abs() / current.abs() * 100.0
            } else {
                0.0
            },
        }
    };

    let mut levels: Vec<FibonacciLevel> = RETRACEMENT_RATIOS
        .iter()
        .map(|&r| level(LevelKind::Retracement, r, swing_low + range * r))
        .chain(
            EXTENSION_RATIOS
                .iter()
                .map(|&r| level(LevelKind::Extension, r, swing_high + range * (r - 1.0))),
        )
        .collect();

    levels.sort_by(|a, b| {
        a.distance_percent
            .total_cmp(&b.distance_percent)
            .then_with(|| a.ratio.total_cmp(&b.ratio))
    });
    Ok(levels)
}

#[derive(Debug, Clone, Copy)]
struct Swing {
    index: usize,
    price: f64,
}

/// 피보나치 분석기.
#[derive(Debug, Clone)]
pub struct FibonacciAnalyzer {
    config: FibonacciConfig,
}

impl FibonacciAnalyzer {
    pub fn new(config: FibonacciConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FibonacciConfig::default())
    }

    /// 이동평균 정렬, 없으면 최근 20봉 중간값 대비 위치로 추세를 판정합니다.
    pub fn trend_direction(&self, series: &PriceSeries) -> TrendDirection {
        let closes = series.closes();
        let current = closes.last().copied().unwrap_or(0.0);

        if let (Some(sma10), Some(sma20), Some(sma50)) = (
            sma_last(&closes, 10),
            sma_last(&closes, 20),
            sma_last(&closes, 50),
        ) {
            if current > sma10 && sma10 > sma20 && sma20 > sma50 {
                return TrendDirection::Uptrend;
            }
            if current < sma10 && sma10 < sma20 && sma20 < sma50 {
                return TrendDirection::Downtrend;
            }
        }

        let tail = closes.len().saturating_sub(20);
        let mid = (max_of(&series.highs()[tail..]) + min_of(&series.lows()[tail..])) / 2.0;
        if current > mid {
            TrendDirection::Uptrend
        } else {
            TrendDirection::Downtrend
        }
    }

    /// 최근 구간에서 양쪽 `swing_window`봉보다 높거나(낮거나) 같은 봉.
    fn find_swings(&self, values: &[f64], offset: usize, high: bool) -> Vec<Swing> {
        let w = self.config.swing_window;
        if values.len() < 2 * w + 1 {
            return Vec::new();
        }
        (w..values.len() - w)
            .filter(|&i| {
                let v = values[i];
                (1..=w).all(|j| {
                    if high {
                        v >= values[i - j] && v >= values[i + j]
                    } else {
                        v <= values[i - j] && v <= values[i + j]
                    }
                })
            })
            .map(|i| Swing {
                index: offset + i,
                price: values[i],
            })
            .collect()
    }

    /// 스윙 쌍을 고르고 레벨을 계산합니다.
    pub fn analyze(&self, series: &PriceSeries) -> StageResult<FibonacciAnalysis> {
        AnalysisError::require_len(series.len(), 2)?;

        let highs = series.highs();
        let lows = series.lows();
        let n = series.len();
        let last = n - 1;
        let current = series.last_bar().close_f64();
        let trend = self.trend_direction(series);

        let offset = n.saturating_sub(self.config.swing_lookback);
        let swing_highs = self.find_swings(&highs[offset..], offset, true);
        let swing_lows = self.find_swings(&lows[offset..], offset, false);
        let recent_start = n.saturating_sub(10);
        let tolerance = self.config.current_bar_tolerance;

        let (low, high, used_current_bar) = if swing_highs.is_empty() || swing_lows.is_empty() {
            let start = n.saturating_sub(self.config.fallback_window);
            let (high, low) = (
                extreme_swing(&highs, start, true),
                extreme_swing(&lows, start, false),
            );
            (low, high, false)
        } else {
            match trend {
                TrendDirection::Uptrend => {
                    let at_low = lows[last] <= min_of(&lows[recent_start..]) * (1.0 + tolerance);
                    let low = if at_low {
                        Swing { index: last, price: lows[last] }
                    } else {
                        *swing_lows.iter().max_by_key(|s| s.index).unwrap_or(&swing_lows[0])
                    };
                    let high = swing_highs
                        .iter()
                        .filter(|s| s.index < low.index)
                        .max_by_key(|s| s.index)
                        .or_else(|| swing_highs.iter().max_by_key(|s| s.index))
                        .copied()
                        .unwrap_or(swing_highs[0]);
                    (low, high, at_low)
                }
                TrendDirection::Downtrend => {
                    let at_high = highs[last] >= max_of(&highs[recent_start..]) * (1.0 - tolerance);
                    let high = if at_high {
                        Swing { index: last, price: highs[last] }
                    } else {
                        *swing_highs.iter().max_by_key(|s| s.index).unwrap_or(&swing_highs[0])
                    };
                    let low = swing_lows
                        .iter()
                        .filter(|s| s.index < high.index)
                        .max_by_key(|s| s.index)
                        .or_else(|| swing_lows.iter().max_by_key(|s| s.index))
                        .copied()
                        .unwrap_or(swing_lows[0]);
                    (low, high, at_high)
                }
            }
        };

        let levels = compute_levels(low.price, high.price, current)?;
        debug!(
            trend = ?trend,
            swing_low = low.price,
            swing_high = high.price,
            "Fibonacci anchors selected"
        );

        let anchor = |swing: Swing| -> StageResult<SwingAnchor> {
            let date = series.date_at(swing.index).ok_or_else(|| {
                AnalysisError::CalculationError(format!("스윙 인덱스 {} 범위 초과", swing.index))
            })?;
            Ok(SwingAnchor {
                index: swing.index,
                date,
                price: swing.price,
            })
        };

        Ok(FibonacciAnalysis {
            trend_direction: trend,
            swing_high: anchor(high)?,
            swing_low: anchor(low)?,
            price_range: high.price - low.price,
            used_current_bar,
            nearest_level: levels.first().cloned(),
            levels,
        })
    }
}

/// `start` 이후 최고가(최저가) 봉. 동률이면 앞선 봉.
fn extreme_swing(values: &[f64], start: usize, high: bool) -> Swing {
    let mut best = Swing {
        index: start,
        price: values[start],
    };
    for (i, &v) in values.iter().enumerate().skip(start + 1) {
        if (high && v > best.price) || (!high && v < best.price) {
            best = Swing { index: i, price: v };
        }
    }
    best
}
