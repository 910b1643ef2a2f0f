//! 추세선 엔진.
//!
//! 최근 K개 극값의 모든 쌍으로 후보 직선을 만들고, 전체 극값에 대해
//! 터치 수를 검증한 뒤 터치 수 + 최근성 점수로 순위를 매깁니다.
//! 저항선(피크)과 지지선(밸리)에 동일하게 사용되며 삼각형/쐐기 분류의
//! 기하 기반이 됩니다.

use chart_core::{PriceSeries, TrendlineConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::extrema::ExtremumPoint;
use crate::math::safe_ratio;

/// 추세선 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    /// 저항선 (피크 연결)
    Resistance,
    /// 지지선 (밸리 연결)
    Support,
}

impl LineRole {
    fn id_prefix(&self) -> &'static str {
        match self {
            LineRole::Resistance => "RES",
            LineRole::Support => "SUP",
        }
    }
}

/// 점수화된 추세선 후보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendlineCandidate {
    pub role: LineRole,
    /// 봉당 기울기
    pub slope: f64,
    /// 인덱스 0에서의 값
    pub intercept: f64,
    /// 직선을 만든 두 극값의 인덱스
    pub anchors: (usize, usize),
    /// 허용 오차 안에 들어온 극값 (인덱스 오름차순)
    pub touches: Vec<ExtremumPoint>,
    /// 터치 수 + 마지막 터치 최근성
    pub score: f64,
}

impl TrendlineCandidate {
    /// 위치 `x`에서 직선 값.
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    pub fn first_touch_index(&self) -> usize {
        self.touches.first().map(|t| t.index).unwrap_or(self.anchors.0)
    }

    pub fn last_touch_index(&self) -> usize {
        self.touches.last().map(|t| t.index).unwrap_or(self.anchors.1)
    }

    fn touch_indices(&self) -> Vec<usize> {
        self.touches.iter().map(|t| t.index).collect()
    }
}

/// 가격이 예측값의 상대 허용 오차 안에 있는지 확인합니다.
pub fn is_touch(price: f64, expected: f64, tolerance: f64) -> bool {
    price > 0.0 && ((price - expected).abs() / price) < tolerance
}

/// 추세선 엔진.
#[derive(Debug, Clone)]
pub struct TrendlineEngine {
    config: TrendlineConfig,
}

impl TrendlineEngine {
    /// 새 엔진을 생성합니다.
    pub fn new(config: TrendlineConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new(TrendlineConfig::default())
    }

    pub fn config(&self) -> &TrendlineConfig {
        &self.config
    }

    /// 역할에 맞는 상위 추세선을 반환합니다 (최대 `max_lines`개).
    ///
    /// 극값이 2개 미만이면 빈 목록을 반환합니다.
    pub fn find_best(
        &self,
        points: &[ExtremumPoint],
        role: LineRole,
        series_len: usize,
        mean_price: f64,
    ) -> Vec<TrendlineCandidate> {
        let mut lines = self.rank_candidates(points, role, series_len, mean_price);
        lines.truncate(self.config.max_lines);
        debug!(?role, lines = lines.len(), "Trendlines selected");
        lines
    }

    /// 검증을 통과한 모든 후보를 순위대로 반환합니다.
    ///
    /// 동일한 터치 집합을 가진 후보는 가장 높은 순위 하나만 남깁니다.
    pub fn rank_candidates(
        &self,
        points: &[ExtremumPoint],
        role: LineRole,
        series_len: usize,
        mean_price: f64,
    ) -> Vec<TrendlineCandidate> {
        if points.len() < 2 {
            return Vec::new();
        }

        let recent_start = points.len().saturating_sub(self.config.max_candidates);
        let recent = &points[recent_start..];
        let slope_limit = self.config.adverse_slope_ratio * mean_price.abs();

        let mut candidates = Vec::new();
        for (i, first) in recent.iter().enumerate() {
            for second in &recent[i + 1..] {
                if let Some(candidate) =
                    self.evaluate_pair(first, second, points, role, series_len, slope_limit)
                {
                    candidates.push(candidate);
                }
            }
        }

        candidates.sort_by(compare_candidates);

        let mut seen: Vec<Vec<usize>> = Vec::new();
        candidates.retain(|c| {
            let key = c.touch_indices();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        candidates
    }

    fn evaluate_pair(
        &self,
        first: &ExtremumPoint,
        second: &ExtremumPoint,
        all_points: &[ExtremumPoint],
        role: LineRole,
        series_len: usize,
        slope_limit: f64,
    ) -> Option<TrendlineCandidate> {
        let (a, b) = if first.index <= second.index {
            (first, second)
        } else {
            (second, first)
        };
        if a.index == b.index {
            return None;
        }

        let slope = (b.price - a.price) / (b.index - a.index) as f64;
        let intercept = a.price - slope * a.index as f64;

        let adverse = match role {
            LineRole::Resistance => slope > slope_limit,
            LineRole::Support => slope < -slope_limit,
        };
        if adverse || !slope.is_finite() {
            return None;
        }

        let touches: Vec<ExtremumPoint> = all_points
            .iter()
            .filter(|p| {
                is_touch(
                    p.price,
                    slope * p.index as f64 + intercept,
                    self.config.touch_tolerance,
                )
            })
            .cloned()
            .collect();

        if touches.len() < self.config.min_touches {
            return None;
        }

        let last_touch = touches.last().map(|t| t.index).unwrap_or(b.index);
        let recency = safe_ratio(last_touch as f64, series_len.saturating_sub(1) as f64);
        let score = touches.len() as f64 + recency.clamp(0.0, 1.0);

        Some(TrendlineCandidate {
            role,
            slope,
            intercept,
            anchors: (a.index, b.index),
            touches,
            score,
        })
    }
}

/// 점수 내림차순, 터치 수 내림차순, 형성 인덱스 오름차순.
fn compare_candidates(a: &TrendlineCandidate, b: &TrendlineCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.touch_count().cmp(&a.touch_count()))
        .then_with(|| a.anchors.cmp(&b.anchors))
}

// ==================== 추세선 레코드 ====================

/// 추세선 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDirection {
    Rising,
    Falling,
    Flat,
}

/// 현재가 대비 근접도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    /// 5% 이내
    High,
    /// 15% 이내
    Medium,
    Low,
}

/// 터치 수 기반 강도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStrength {
    /// 3회 이상 터치
    Strong,
    Moderate,
}

/// 터치 이력 항목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
}

/// 미래 시점 투영값.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineProjections {
    pub plus_1: f64,
    pub plus_7: f64,
    pub plus_30: f64,
}

/// 소비자에게 전달되는 추세선 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendlineRecord {
    /// 예: `RES_01`, `SUP_02`
    pub trendline_id: String,
    pub role: LineRole,
    pub direction: LineDirection,
    pub slope: f64,
    pub intercept: f64,
    /// 마지막 봉에서의 직선 값
    pub current_value: f64,
    /// 현재 종가와의 차이 (직선 - 종가)
    pub distance: f64,
    /// 현재 종가 대비 거리 (%, 절대값)
    pub distance_percent: f64,
    pub relevance: Relevance,
    pub strength: LineStrength,
    pub touch_count: usize,
    pub touches: Vec<TouchPoint>,
    pub projections: LineProjections,
    /// 현재 기울기로 종가와 만나기까지의 봉 수 (365봉 이내일 때만)
    pub bars_to_intersection: Option<u32>,
    pub score: f64,
}

impl TrendlineRecord {
    /// 후보를 레코드로 변환합니다.
    ///
    /// `flat_tolerance`는 방향 판정용 기울기 허용치 (가격 단위/봉)입니다.
    pub fn from_candidate(
        candidate: &TrendlineCandidate,
        rank: usize,
        series: &PriceSeries,
        current_price: f64,
        flat_tolerance: f64,
    ) -> Self {
        let last_index = series.len().saturating_sub(1) as f64;
        let current_value = candidate.value_at(last_index);
        let distance = current_value - current_price;
        let distance_percent = safe_ratio(distance.abs(), current_price) * 100.0;

        let direction = if candidate.slope.abs() <= flat_tolerance {
            LineDirection::Flat
        } else if candidate.slope > 0.0 {
            LineDirection::Rising
        } else {
            LineDirection::Falling
        };

        let relevance = if distance_percent <= 5.0 {
            Relevance::High
        } else if distance_percent <= 15.0 {
            Relevance::Medium
        } else {
            Relevance::Low
        };

        let strength = if candidate.touch_count() >= 3 {
            LineStrength::Strong
        } else {
            LineStrength::Moderate
        };

        let bars_to_intersection = if candidate.slope.abs() > 0.01 {
            let bars = (current_price - current_value) / candidate.slope;
            (bars > 0.0 && bars <= 365.0).then(|| bars.ceil() as u32)
        } else {
            None
        };

        Self {
            trendline_id: format!("{}_{:02}", candidate.role.id_prefix(), rank + 1),
            role: candidate.role,
            direction,
            slope: candidate.slope,
            intercept: candidate.intercept,
            current_value,
            distance,
            distance_percent,
            relevance,
            strength,
            touch_count: candidate.touch_count(),
            touches: candidate
                .touches
                .iter()
                .map(|t| TouchPoint {
                    index: t.index,
                    date: t.date,
                    price: t.price,
                })
                .collect(),
            projections: LineProjections {
                plus_1: candidate.value_at(last_index + 1.0),
                plus_7: candidate.value_at(last_index + 7.0),
                plus_30: candidate.value_at(last_index + 30.0),
            },
            bars_to_intersection,
            score: candidate.score,
        }
    }
}

// ==================== 테스트 ====================
