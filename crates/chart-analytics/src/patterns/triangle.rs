//! 삼각형/쐐기 분류기.
//!
//! 추세선 엔진의 상위 저항선/지지선 조합의 기울기 부호로 유형을 판정하고,
//! 두 직선의 교차점(꼭짓점)이 미래의 허용 범위 안에 있을 때만 채택합니다.

use chart_core::TriangleConfig;
use chrono::Duration;

use super::{
    all_passed, Apex, ClassifierOutput, ConditionResult, KeyPoint, LineEquation,
    PatternClassifier, PatternContext, PatternFamily, PatternGeometry, PatternKind,
    PatternRecord, RejectedPattern, TimeRange,
};
use crate::error::StageResult;
use crate::trendline::TrendlineCandidate;

/// 기울기 조합으로 삼각형/쐐기 유형을 판정합니다.
///
/// `flat`은 평탄으로 볼 기울기 허용치 (가격 단위/봉)입니다.
pub fn classify_slopes(resistance: f64, support: f64, flat: f64) -> Option<PatternKind> {
    let res_flat = resistance.abs() <= flat;
    let sup_flat = support.abs() <= flat;

    if res_flat && support > flat {
        Some(PatternKind::AscendingTriangle)
    } else if resistance < -flat && sup_flat {
        Some(PatternKind::DescendingTriangle)
    } else if resistance < -flat && support > flat {
        Some(PatternKind::SymmetricalTriangle)
    } else if resistance > flat && support > flat && support > resistance {
        Some(PatternKind::RisingWedge)
    } else if resistance < -flat && support < -flat && resistance < support {
        Some(PatternKind::FallingWedge)
    } else {
        None
    }
}

/// 삼각형/쐐기 분류기.
#[derive(Debug, Clone)]
pub struct TriangleClassifier {
    config: TriangleConfig,
}

impl TriangleClassifier {
    pub fn new(config: TriangleConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TriangleConfig::default())
    }

    fn evaluate_pair(
        &self,
        ctx: &PatternContext<'_>,
        ranks: (usize, usize),
        resistance: &TrendlineCandidate,
        support: &TrendlineCandidate,
    ) -> StageResult<Result<PatternRecord, RejectedPattern>> {
        let flat = self.config.flat_slope_ratio * ctx.mean_price.abs();
        let last_index = ctx.last_index();
        let kind = classify_slopes(resistance.slope, support.slope, flat);

        let start = resistance.first_touch_index().min(support.first_touch_index());
        let end = resistance.last_touch_index().max(support.last_touch_index());
        let duration = (end - start).max(1) as f64;
        let horizon = duration * self.config.apex_horizon_ratio;

        let slope_gap = resistance.slope - support.slope;
        let apex_index = if slope_gap.abs() > f64::EPSILON {
            Some((support.intercept - resistance.intercept) / slope_gap)
        } else {
            None
        };
        // 마지막 봉에서 저항선이 지지선 위에 있어야 앞으로 수렴
        let gap_now = resistance.value_at(last_index as f64) - support.value_at(last_index as f64);
        let bars_ahead = apex_index.map(|x| x - last_index as f64).unwrap_or(0.0);
        let converging = apex_index.is_some() && gap_now > 0.0;

        let conditions = vec![
            ConditionResult {
                name: "slope_pattern".to_string(),
                passed: kind.is_some(),
                value: resistance.slope,
                threshold: flat,
                upper: Some(support.slope),
                rule: "resistance/support slope combination matches a triangle or wedge"
                    .to_string(),
            },
            ConditionResult::above("lines_converge", if converging { gap_now } else { 0.0 }, 0.0),
            ConditionResult::above("apex_in_future", bars_ahead, 0.0),
            ConditionResult::between("apex_within_horizon", bars_ahead, 0.0, horizon),
        ];

        let time_range = TimeRange::new(ctx.series, start, end)?;
        let mut key_points = Vec::new();
        for touch in &resistance.touches {
            key_points.push(KeyPoint::from_extremum("resistance_touch", touch));
        }
        for touch in &support.touches {
            key_points.push(KeyPoint::from_extremum("support_touch", touch));
        }
        key_points.sort_by_key(|p| p.index);

        let (Some(kind), Some(apex_index), true) = (kind, apex_index, all_passed(&conditions))
        else {
            let id = format!("FAIL_TRI_R{}S{}", ranks.0 + 1, ranks.1 + 1);
            return Ok(Err(RejectedPattern::new(
                id,
                PatternFamily::Triangle,
                kind,
                time_range,
                key_points,
                conditions,
            )));
        };

        let apex_date = ctx.series.last_date() + Duration::days(bars_ahead.ceil() as i64);
        let apex = Apex {
            index: apex_index,
            bars_ahead,
            date: apex_date,
            price: resistance.value_at(apex_index),
            is_active: true,
        };

        let touches = resistance.touch_count() + support.touch_count();
        let confidence = 0.80 + (touches as f64 / 10.0).min(0.15);
        let target = match kind.bias() {
            super::Bias::Bullish => Some(resistance.value_at(last_index as f64) + gap_now),
            super::Bias::Bearish => Some(support.value_at(last_index as f64) - gap_now),
            super::Bias::Neutral => None,
        };

        Ok(Ok(PatternRecord::new(
            kind,
            time_range,
            confidence,
            key_points,
            conditions,
            PatternGeometry::Converging {
                resistance: LineEquation::from_candidate(resistance),
                support: LineEquation::from_candidate(support),
                apex,
            },
            target,
        )))
    }
}

impl PatternClassifier for TriangleClassifier {
    fn family(&self) -> PatternFamily {
        PatternFamily::Triangle
    }

    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput> {
        let mut output = ClassifierOutput::default();

        for (ri, resistance) in ctx.resistance.iter().enumerate() {
            for (si, support) in ctx.support.iter().enumerate() {
                match self.evaluate_pair(ctx, (ri, si), resistance, support)? {
                    Ok(record) => {
                        // 유형별로 가장 높은 순위의 조합 하나만 채택
                        if output.accepted.iter().all(|r| r.kind != record.kind) {
                            output.accepted.push(record);
                        }
                    }
                    Err(rejected) => output.rejected.push(rejected),
                }
            }
        }

        Ok(output)
    }
}
