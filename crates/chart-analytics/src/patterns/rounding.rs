//! 라운딩 천장/바닥 분류기.
//!
//! 평활 종가의 2차 미분(곡률)을 평균 가격으로 정규화한 뒤, 창 전체에서
//! 곡률 부호가 일관되고 창 안에 극값이 존재하는 구간을 찾습니다.

use chart_core::RoundingConfig;

use super::{
    all_passed, ClassifierOutput, ConditionResult, KeyPoint, PatternClassifier, PatternContext,
    PatternFamily, PatternGeometry, PatternKind, PatternRecord, RejectedPattern, TimeRange,
};
use crate::error::StageResult;
use crate::extrema::ExtremumPoint;
use crate::math::{mean, std_dev};

/// 라운딩 분류기.
#[derive(Debug, Clone)]
pub struct RoundingClassifier {
    config: RoundingConfig,
}

impl RoundingClassifier {
    pub fn new(config: RoundingConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RoundingConfig::default())
    }
}

/// `[start, end)` 안에서 가장 극단적인 극값.
fn extreme_in(points: &[ExtremumPoint], start: usize, end: usize, lowest: bool) -> Option<&ExtremumPoint> {
    points
        .iter()
        .filter(|p| p.index >= start && p.index < end)
        .min_by(|a, b| {
            let ord = a.price.total_cmp(&b.price);
            let ord = if lowest { ord } else { ord.reverse() };
            ord.then(a.index.cmp(&b.index))
        })
}

impl PatternClassifier for RoundingClassifier {
    fn family(&self) -> PatternFamily {
        PatternFamily::Rounding
    }

    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput> {
        let mut output = ClassifierOutput::default();
        let w = self.config.window;
        let values = &ctx.smoothed.close.values;
        let n = values.len();
        if w == 0 || ctx.mean_price <= 0.0 || n < 2 * w {
            return Ok(output);
        }

        let curvature: Vec<f64> = ctx
            .smoothed
            .close
            .curvature
            .iter()
            .map(|c| c / ctx.mean_price)
            .collect();

        let mut center = w;
        while center + w <= n {
            let (start, end) = (center - w, center + w);
            let segment = &curvature[start..end];
            let mean_curvature = mean(segment);
            if mean_curvature.abs() < self.config.min_curvature {
                center += 1;
                continue;
            }

            let is_bottom = mean_curvature > 0.0;
            let kind = if is_bottom {
                PatternKind::RoundingBottom
            } else {
                PatternKind::RoundingTop
            };
            let candidates = if is_bottom {
                &ctx.extrema.valleys
            } else {
                &ctx.extrema.peaks
            };
            let extreme = extreme_in(candidates, start, end, is_bottom);
            let curvature_std = std_dev(segment);

            let conditions = vec![
                ConditionResult::below(
                    "curvature_consistency",
                    curvature_std,
                    self.config.max_curvature_std,
                ),
                ConditionResult::above(
                    "extremum_present",
                    if extreme.is_some() { 1.0 } else { 0.0 },
                    0.0,
                ),
            ];

            let last = end - 1;
            let time_range = TimeRange::new(ctx.series, start, last)?;
            let mut key_points = vec![KeyPoint::at("window_start", ctx.series, start, values[start])?];
            if let Some(point) = extreme {
                key_points.push(KeyPoint::from_extremum("extreme", point));
            }
            key_points.push(KeyPoint::at("window_end", ctx.series, last, values[last])?);

            match (extreme, all_passed(&conditions)) {
                (Some(point), true) => {
                    let (rim, target) = if is_bottom {
                        let rim = values[start].max(values[last]);
                        (rim, rim + (rim - point.price))
                    } else {
                        let rim = values[start].min(values[last]);
                        (rim, rim - (point.price - rim))
                    };
                    output.accepted.push(PatternRecord::new(
                        kind,
                        time_range,
                        self.config.confidence,
                        key_points,
                        conditions,
                        PatternGeometry::Rounding {
                            mean_curvature,
                            curvature_std,
                            extreme_price: point.price,
                            rim_price: rim,
                        },
                        Some(target),
                    ));
                }
                _ => output.rejected.push(RejectedPattern::for_kind(
                    kind,
                    PatternFamily::Rounding,
                    time_range,
                    key_points,
                    conditions,
                )),
            }
            center += w;
        }

        Ok(output)
    }
}
