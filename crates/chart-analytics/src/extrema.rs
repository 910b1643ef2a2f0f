//! 극값(스윙 고점/저점) 탐지.
//!
//! 평활된 고가 배열의 국소 최댓값을 피크로, 평활된 저가 배열의 국소
//! 최솟값을 밸리로 찾습니다. 후보는 최소 간격 조건을 먼저 통과한 뒤
//! 돌출도 조건을 통과해야 합니다.

use chart_core::{to_f64, ExtremaConfig, PriceSeries, ProminenceMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::smoothing::SmoothedPrices;

/// 극값 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    Peak,
    Valley,
}

/// 스윙 고점 또는 저점.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremumPoint {
    /// 봉 위치
    pub index: usize,
    /// 거래일
    pub date: NaiveDate,
    /// 평활 가격
    pub price: f64,
    /// 종류
    pub kind: ExtremumKind,
    /// 돌출도
    pub strength: f64,
}

/// 한 번의 실행에서 찾은 극값 목록 (각각 인덱스 오름차순).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub peaks: Vec<ExtremumPoint>,
    pub valleys: Vec<ExtremumPoint>,
    /// 실제 적용된 돌출도 임계값 (가격 단위)
    pub prominence_threshold: f64,
}

/// 극값 탐지기.
#[derive(Debug, Clone)]
pub struct ExtremaDetector {
    config: ExtremaConfig,
}

impl ExtremaDetector {
    /// 새 탐지기를 생성합니다.
    pub fn new(config: ExtremaConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new(ExtremaConfig::default())
    }

    /// 시계열에서 피크와 밸리를 찾습니다.
    pub fn detect(&self, series: &PriceSeries, smoothed: &SmoothedPrices) -> Extrema {
        let threshold = self.prominence_threshold(series);

        let peaks = find_peaks(&smoothed.high.values, self.config.min_distance, threshold)
            .into_iter()
            .map(|(index, strength)| ExtremumPoint {
                index,
                date: series.bars()[index].date,
                price: smoothed.high.values[index],
                kind: ExtremumKind::Peak,
                strength,
            })
            .collect::<Vec<_>>();

        let negated_lows: Vec<f64> = smoothed.low.values.iter().map(|v| -v).collect();
        let valleys = find_peaks(&negated_lows, self.config.min_distance, threshold)
            .into_iter()
            .map(|(index, strength)| ExtremumPoint {
                index,
                date: series.bars()[index].date,
                price: smoothed.low.values[index],
                kind: ExtremumKind::Valley,
                strength,
            })
            .collect::<Vec<_>>();

        debug!(
            peaks = peaks.len(),
            valleys = valleys.len(),
            threshold,
            "Extrema detected"
        );

        Extrema {
            peaks,
            valleys,
            prominence_threshold: threshold,
        }
    }

    /// 설정 방식에 따른 돌출도 임계값 (가격 단위).
    ///
    /// ATR 방식은 시계열이 ATR 기간보다 짧으면 절대값 0.5로 대체됩니다.
    pub fn prominence_threshold(&self, series: &PriceSeries) -> f64 {
        match self.config.prominence_mode {
            ProminenceMode::Absolute => self.config.prominence,
            ProminenceMode::AtrMultiple => average_true_range(series, self.config.atr_period)
                .map(|atr| atr * self.config.prominence)
                .unwrap_or_else(|| ExtremaConfig::default().prominence),
        }
    }
}

/// 최근 `period`개 봉의 평균 True Range.
pub fn average_true_range(series: &PriceSeries, period: usize) -> Option<f64> {
    let bars = series.bars();
    if period == 0 || bars.len() <= period {
        return None;
    }
    let start = bars.len() - period;
    let total: f64 = (start..bars.len())
        .map(|i| to_f64(bars[i].true_range(Some(bars[i - 1].close))))
        .sum();
    Some(total / period as f64)
}

/// 국소 최댓값 후보. 평탄 구간은 중앙 인덱스를 사용하고, 배열 끝에 닿는
/// 평탄 구간은 제외합니다.
fn local_maxima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut maxima = Vec::new();
    if n < 3 {
        return maxima;
    }

    let mut i = 1;
    while i < n - 1 {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// 높은 후보부터 `distance` 미만으로 가까운 낮은 후보를 제거합니다.
fn filter_by_distance(values: &[f64], candidates: &[usize], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        values[candidates[b]]
            .total_cmp(&values[candidates[a]])
            .then(candidates[a].cmp(&candidates[b]))
    });

    let mut keep = vec![true; candidates.len()];
    for &pos in &order {
        if !keep[pos] {
            continue;
        }
        let center = candidates[pos];
        for (other, &index) in candidates.iter().enumerate() {
            if other != pos && keep[other] && index.abs_diff(center) < distance {
                keep[other] = false;
            }
        }
    }

    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&index, kept)| kept.then_some(index))
        .collect()
}

/// 피크의 돌출도: 양쪽에서 더 높은 값을 만나기 전까지의 최저점 중
/// 높은 쪽을 기준으로 한 높이.
pub fn prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];

    let mut left_min = height;
    for &v in values[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &values[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// 최소 간격과 최소 돌출도를 만족하는 피크의 `(인덱스, 돌출도)` 목록.
pub fn find_peaks(values: &[f64], distance: usize, min_prominence: f64) -> Vec<(usize, f64)> {
    let candidates = local_maxima(values);
    let spaced = if distance > 1 {
        filter_by_distance(values, &candidates, distance)
    } else {
        candidates
    };

    spaced
        .into_iter()
        .map(|index| (index, prominence(values, index)))
        .filter(|(_, p)| *p >= min_prominence)
        .collect()
}

// ==================== 테스트 ====================
