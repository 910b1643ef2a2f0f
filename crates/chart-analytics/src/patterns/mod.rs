//! 차트 패턴 분류기.
//!
//! 각 분류기는 극값, 추세선, 가격 시계열을 받아 채택된 패턴과
//! 거부된 시도(실패 조건 명시)를 함께 반환하는 순수 함수입니다.
//!
//! - 반전 패턴: Head and Shoulders, Double Top/Bottom, Rounding Top/Bottom
//! - 지속/수렴 패턴: Triangle, Wedge, Flag, Cup and Handle

pub mod cup_handle;
pub mod double;
pub mod flag;
pub mod head_shoulders;
pub mod rounding;
pub mod triangle;

use chart_core::{PatternConfig, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, StageResult};
use crate::extrema::{Extrema, ExtremumPoint};
use crate::math::finite_or;
use crate::smoothing::SmoothedPrices;
use crate::trendline::TrendlineCandidate;

pub use cup_handle::CupHandleClassifier;
pub use double::DoubleExtremumClassifier;
pub use flag::FlagClassifier;
pub use head_shoulders::HeadShouldersClassifier;
pub use rounding::RoundingClassifier;
pub use triangle::TriangleClassifier;

// ==================== 패턴 타입 ====================

/// 차트 패턴 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Head and Shoulders - 머리어깨형 (하락 반전)
    HeadAndShoulders,
    /// Double Top - 이중 천장 (하락 반전)
    DoubleTop,
    /// Double Bottom - 이중 바닥 (상승 반전)
    DoubleBottom,
    /// Ascending Triangle - 상승 삼각형 (상승)
    AscendingTriangle,
    /// Descending Triangle - 하락 삼각형 (하락)
    DescendingTriangle,
    /// Symmetrical Triangle - 대칭 삼각형 (방향 불확실)
    SymmetricalTriangle,
    /// Rising Wedge - 상승 쐐기 (하락 반전)
    RisingWedge,
    /// Falling Wedge - 하락 쐐기 (상승 반전)
    FallingWedge,
    /// Bull Flag - 상승 깃발
    BullFlag,
    /// Bear Flag - 하락 깃발
    BearFlag,
    /// Cup and Handle - 컵앤핸들 (상승)
    CupAndHandle,
    /// Rounding Top - 둥근 천장 (하락 반전)
    RoundingTop,
    /// Rounding Bottom - 둥근 바닥 (상승 반전)
    RoundingBottom,
}

impl PatternKind {
    /// 사람이 읽는 이름.
    pub fn display_name(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "Head and Shoulders",
            PatternKind::DoubleTop => "Double Top",
            PatternKind::DoubleBottom => "Double Bottom",
            PatternKind::AscendingTriangle => "Ascending Triangle",
            PatternKind::DescendingTriangle => "Descending Triangle",
            PatternKind::SymmetricalTriangle => "Symmetrical Triangle",
            PatternKind::RisingWedge => "Rising Wedge",
            PatternKind::FallingWedge => "Falling Wedge",
            PatternKind::BullFlag => "Bull Flag",
            PatternKind::BearFlag => "Bear Flag",
            PatternKind::CupAndHandle => "Cup and Handle",
            PatternKind::RoundingTop => "Rounding Top",
            PatternKind::RoundingBottom => "Rounding Bottom",
        }
    }

    /// 패턴 ID 접두어.
    pub fn code(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "HS",
            PatternKind::DoubleTop => "DT",
            PatternKind::DoubleBottom => "DB",
            PatternKind::AscendingTriangle => "AT",
            PatternKind::DescendingTriangle => "DST",
            PatternKind::SymmetricalTriangle => "ST",
            PatternKind::RisingWedge => "RW",
            PatternKind::FallingWedge => "FW",
            PatternKind::BullFlag => "BF",
            PatternKind::BearFlag => "BRF",
            PatternKind::CupAndHandle => "CH",
            PatternKind::RoundingTop => "RT",
            PatternKind::RoundingBottom => "RB",
        }
    }

    /// 패턴 유형의 기본 방향성.
    pub fn bias(&self) -> Bias {
        match self {
            PatternKind::DoubleBottom
            | PatternKind::AscendingTriangle
            | PatternKind::FallingWedge
            | PatternKind::BullFlag
            | PatternKind::CupAndHandle
            | PatternKind::RoundingBottom => Bias::Bullish,
            PatternKind::HeadAndShoulders
            | PatternKind::DoubleTop
            | PatternKind::DescendingTriangle
            | PatternKind::RisingWedge
            | PatternKind::BearFlag
            | PatternKind::RoundingTop => Bias::Bearish,
            PatternKind::SymmetricalTriangle => Bias::Neutral,
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 분류기 계열. 섹션 상태와 거부 레코드를 묶는 단위입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    HeadAndShoulders,
    DoubleExtremum,
    Triangle,
    Flag,
    CupAndHandle,
    Rounding,
}

impl PatternFamily {
    pub fn name(&self) -> &'static str {
        match self {
            PatternFamily::HeadAndShoulders => "head_and_shoulders",
            PatternFamily::DoubleExtremum => "double_extremum",
            PatternFamily::Triangle => "triangle",
            PatternFamily::Flag => "flag",
            PatternFamily::CupAndHandle => "cup_and_handle",
            PatternFamily::Rounding => "rounding",
        }
    }
}

/// 예상 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

/// 패턴 형성 구간.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_index: usize,
    pub end_index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 포함된 봉 수
    pub bars: usize,
}

impl TimeRange {
    /// 시계열 위치로 구간을 만듭니다.
    pub fn new(series: &PriceSeries, start: usize, end: usize) -> StageResult<Self> {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let lookup = |index: usize| {
            series.date_at(index).ok_or_else(|| {
                AnalysisError::CalculationError(format!(
                    "인덱스 {}가 시계열 범위({})를 벗어났습니다",
                    index,
                    series.len()
                ))
            })
        };
        Ok(Self {
            start_index: start,
            end_index: end,
            start_date: lookup(start)?,
            end_date: lookup(end)?,
            bars: end - start + 1,
        })
    }
}

/// 패턴의 주요 지점.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    /// 역할 (left_shoulder, head, apex 등)
    pub label: String,
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
}

impl KeyPoint {
    pub fn from_extremum(label: &str, point: &ExtremumPoint) -> Self {
        Self {
            label: label.to_string(),
            index: point.index,
            date: point.date,
            price: point.price,
        }
    }

    pub fn at(label: &str, series: &PriceSeries, index: usize, price: f64) -> StageResult<Self> {
        let date = series.date_at(index).ok_or_else(|| {
            AnalysisError::CalculationError(format!("키 포인트 인덱스 {} 범위 초과", index))
        })?;
        Ok(Self {
            label: label.to_string(),
            index,
            date,
            price,
        })
    }
}

/// 이름이 붙은 조건 판정 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub name: String,
    pub passed: bool,
    /// 측정값
    pub value: f64,
    /// 기준값 (범위 조건이면 하한)
    pub threshold: f64,
    /// 범위 조건의 상한
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    /// 사람이 읽는 규칙
    pub rule: String,
}

impl ConditionResult {
    /// `value < threshold`.
    pub fn below(name: &str, value: f64, threshold: f64) -> Self {
        let value = finite_or(value, f64::MAX);
        Self {
            name: name.to_string(),
            passed: value < threshold,
            value,
            threshold,
            upper: None,
            rule: format!("{} < {}", name, threshold),
        }
    }

    /// `value > threshold`.
    pub fn above(name: &str, value: f64, threshold: f64) -> Self {
        let value = finite_or(value, f64::MIN);
        Self {
            name: name.to_string(),
            passed: value > threshold,
            value,
            threshold,
            upper: None,
            rule: format!("{} > {}", name, threshold),
        }
    }

    /// `lower <= value <= upper`.
    pub fn between(name: &str, value: f64, lower: f64, upper: f64) -> Self {
        let value = finite_or(value, f64::MIN);
        Self {
            name: name.to_string(),
            passed: value >= lower && value <= upper,
            value,
            threshold: lower,
            upper: Some(upper),
            rule: format!("{} <= {} <= {}", lower, name, upper),
        }
    }

    /// `lower < value < upper`.
    pub fn strictly_between(name: &str, value: f64, lower: f64, upper: f64) -> Self {
        let value = finite_or(value, f64::MIN);
        Self {
            name: name.to_string(),
            passed: value > lower && value < upper,
            value,
            threshold: lower,
            upper: Some(upper),
            rule: format!("{} < {} < {}", lower, name, upper),
        }
    }
}

/// 직선 방정식.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineEquation {
    pub slope: f64,
    pub intercept: f64,
    pub touch_count: usize,
}

impl LineEquation {
    pub fn from_candidate(line: &TrendlineCandidate) -> Self {
        Self {
            slope: line.slope,
            intercept: line.intercept,
            touch_count: line.touch_count(),
        }
    }

    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// 두 수렴 추세선의 교차점.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apex {
    /// 교차 위치 (소수 인덱스)
    pub index: f64,
    /// 마지막 봉 이후 남은 봉 수
    pub bars_ahead: f64,
    /// 예상 날짜 (마지막 거래일 + 남은 봉 수 올림 일수)
    pub date: NaiveDate,
    pub price: f64,
    pub is_active: bool,
}

/// 패턴 유형별 기하 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PatternGeometry {
    /// 머리어깨형 넥라인
    Neckline {
        slope: f64,
        intercept: f64,
        left_valley: f64,
        right_valley: f64,
        head_height: f64,
    },
    /// 이중 천장/바닥
    DoubleExtremum {
        first_price: f64,
        second_price: f64,
        intervening_price: f64,
        price_gap: f64,
        depth: f64,
    },
    /// 삼각형/쐐기
    Converging {
        resistance: LineEquation,
        support: LineEquation,
        apex: Apex,
    },
    /// 깃대와 깃발
    Flag {
        pole_move: f64,
        pole_change: f64,
        pole_slope: f64,
        flag_slope: f64,
        pole_std: f64,
        flag_std: f64,
        flag_high: f64,
        flag_low: f64,
        flag_close: f64,
    },
    /// 컵과 핸들
    Cup {
        rim_price: f64,
        bottom_price: f64,
        depth: f64,
        asymmetry: f64,
        handle_low: f64,
        handle_depth: f64,
    },
    /// 곡률 기반 라운딩
    Rounding {
        mean_curvature: f64,
        curvature_std: f64,
        extreme_price: f64,
        rim_price: f64,
    },
}

/// 채택된 패턴.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub pattern_id: String,
    pub kind: PatternKind,
    pub name: String,
    pub bias: Bias,
    pub time_range: TimeRange,
    /// 내부 신뢰도 (0.0 ~ 1.0)
    pub base_confidence: f64,
    pub key_points: Vec<KeyPoint>,
    pub conditions: Vec<ConditionResult>,
    pub geometry: PatternGeometry,
    /// 목표가
    pub price_target: Option<f64>,
}

impl PatternRecord {
    /// 기본 ID(`코드_시작인덱스`)로 레코드를 만듭니다.
    pub fn new(
        kind: PatternKind,
        time_range: TimeRange,
        base_confidence: f64,
        key_points: Vec<KeyPoint>,
        conditions: Vec<ConditionResult>,
        geometry: PatternGeometry,
        price_target: Option<f64>,
    ) -> Self {
        Self {
            pattern_id: format!("{}_{:04}", kind.code(), time_range.start_index),
            kind,
            name: kind.display_name().to_string(),
            bias: kind.bias(),
            time_range,
            base_confidence: finite_or(base_confidence, 0.0).clamp(0.0, 1.0),
            key_points,
            conditions,
            geometry,
            price_target: price_target.filter(|p| p.is_finite()).map(|p| p.max(0.0)),
        }
    }
}

/// 조건을 통과하지 못한 패턴 시도.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedPattern {
    pub pattern_id: String,
    pub family: PatternFamily,
    /// 기울기 분류 전 실패한 경우 `None`
    pub attempted: Option<PatternKind>,
    pub time_range: TimeRange,
    pub key_points: Vec<KeyPoint>,
    pub conditions: Vec<ConditionResult>,
    /// 실패한 조건 이름
    pub failed: Vec<String>,
    /// 예: "Failed on: shoulder_symmetry, neckline_level"
    pub reason: String,
}

impl RejectedPattern {
    pub fn new(
        pattern_id: String,
        family: PatternFamily,
        attempted: Option<PatternKind>,
        time_range: TimeRange,
        key_points: Vec<KeyPoint>,
        conditions: Vec<ConditionResult>,
    ) -> Self {
        let failed: Vec<String> = conditions
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.clone())
            .collect();
        let reason = format!("Failed on: {}", failed.join(", "));
        Self {
            pattern_id,
            family,
            attempted,
            time_range,
            key_points,
            conditions,
            failed,
            reason,
        }
    }

    /// `FAIL_코드_시작인덱스` 형식 ID를 사용하는 거부 레코드.
    pub fn for_kind(
        kind: PatternKind,
        family: PatternFamily,
        time_range: TimeRange,
        key_points: Vec<KeyPoint>,
        conditions: Vec<ConditionResult>,
    ) -> Self {
        let id = format!("FAIL_{}_{:04}", kind.code(), time_range.start_index);
        Self::new(id, family, Some(kind), time_range, key_points, conditions)
    }
}

/// 모든 조건이 통과했는지 확인합니다.
pub fn all_passed(conditions: &[ConditionResult]) -> bool {
    conditions.iter().all(|c| c.passed)
}

/// 분류기 출력.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierOutput {
    pub accepted: Vec<PatternRecord>,
    pub rejected: Vec<RejectedPattern>,
}

/// 분류기에 전달되는 실행 단위 입력.
#[derive(Debug, Clone, Copy)]
pub struct PatternContext<'a> {
    pub series: &'a PriceSeries,
    pub closes: &'a [f64],
    pub smoothed: &'a SmoothedPrices,
    pub extrema: &'a Extrema,
    pub resistance: &'a [TrendlineCandidate],
    pub support: &'a [TrendlineCandidate],
    /// 분석 구간 평균 종가
    pub mean_price: f64,
}

impl PatternContext<'_> {
    pub fn last_index(&self) -> usize {
        self.series.len().saturating_sub(1)
    }
}

/// 패턴 분류기 인터페이스.
pub trait PatternClassifier: Send + Sync {
    /// 분류기 계열.
    fn family(&self) -> PatternFamily;

    /// 패턴을 분류합니다.
    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput>;
}

/// 설정으로 모든 분류기를 생성합니다.
pub fn default_classifiers(config: &PatternConfig) -> Vec<Box<dyn PatternClassifier>> {
    vec![
        Box::new(HeadShouldersClassifier::new(config.head_shoulders.clone())),
        Box::new(DoubleExtremumClassifier::new(config.double.clone())),
        Box::new(TriangleClassifier::new(config.triangle.clone())),
        Box::new(FlagClassifier::new(config.flag.clone())),
        Box::new(CupHandleClassifier::new(config.cup_handle.clone())),
        Box::new(RoundingClassifier::new(config.rounding.clone())),
    ]
}

/// `(start, end)` 사이(양끝 제외)의 극값 중 가격 기준 극단값.
pub(crate) fn extreme_between(
    points: &[ExtremumPoint],
    start: usize,
    end: usize,
    lowest: bool,
) -> Option<&ExtremumPoint> {
    points
        .iter()
        .filter(|p| p.index > start && p.index < end)
        .min_by(|a, b| {
            let ord = a.price.total_cmp(&b.price);
            let ord = if lowest { ord } else { ord.reverse() };
            ord.then(a.index.cmp(&b.index))
        })
}
