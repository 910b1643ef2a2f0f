//! Head and Shoulders 분류기.
//!
//! 연속된 세 피크(왼쪽 어깨, 머리, 오른쪽 어깨)와 그 사이 밸리 두 개를
//! 대상으로 네 가지 조건을 독립적으로 평가합니다.

use chart_core::HeadShouldersConfig;

use super::{
    all_passed, extreme_between, ClassifierOutput, ConditionResult, KeyPoint, PatternClassifier,
    PatternContext, PatternFamily, PatternGeometry, PatternKind, PatternRecord, RejectedPattern,
    TimeRange,
};
use crate::error::StageResult;

/// Head and Shoulders 분류기.
#[derive(Debug, Clone)]
pub struct HeadShouldersClassifier {
    config: HeadShouldersConfig,
}

impl HeadShouldersClassifier {
    pub fn new(config: HeadShouldersConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(HeadShouldersConfig::default())
    }

    /// 네 가지 조건을 평가합니다.
    ///
    /// - `head_dominance`: 머리가 양 어깨보다 높음
    /// - `shoulder_symmetry`: 어깨 상대 차이 < 허용 오차
    /// - `neckline_level`: 두 밸리 상대 차이 < 허용 오차 × 0.6
    /// - `head_significance`: 머리가 높은 어깨보다 허용 오차 × 0.4 이상 높음
    pub fn evaluate(
        &self,
        left_shoulder: f64,
        head: f64,
        right_shoulder: f64,
        left_valley: f64,
        right_valley: f64,
    ) -> Vec<ConditionResult> {
        let tolerance = self.config.tolerance;
        let higher_shoulder = left_shoulder.max(right_shoulder);

        vec![
            ConditionResult::above("head_dominance", head - higher_shoulder, 0.0),
            ConditionResult::below(
                "shoulder_symmetry",
                (left_shoulder - right_shoulder).abs() / left_shoulder,
                tolerance,
            ),
            ConditionResult::below(
                "neckline_level",
                (left_valley - right_valley).abs() / left_valley,
                tolerance * 0.6,
            ),
            ConditionResult::above(
                "head_significance",
                (head - higher_shoulder) / head,
                tolerance * 0.4,
            ),
        ]
    }
}

impl PatternClassifier for HeadShouldersClassifier {
    fn family(&self) -> PatternFamily {
        PatternFamily::HeadAndShoulders
    }

    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput> {
        let mut output = ClassifierOutput::default();
        let peaks = &ctx.extrema.peaks;
        let valleys = &ctx.extrema.valleys;

        for triple in peaks.windows(3) {
            let (ls, head, rs) = (&triple[0], &triple[1], &triple[2]);

            let (Some(lv), Some(rv)) = (
                extreme_between(valleys, ls.index, head.index, true),
                extreme_between(valleys, head.index, rs.index, true),
            ) else {
                continue;
            };

            let conditions = self.evaluate(ls.price, head.price, rs.price, lv.price, rv.price);
            let time_range = TimeRange::new(ctx.series, ls.index, rs.index)?;
            let key_points = vec![
                KeyPoint::from_extremum("left_shoulder", ls),
                KeyPoint::from_extremum("left_valley", lv),
                KeyPoint::from_extremum("head", head),
                KeyPoint::from_extremum("right_valley", rv),
                KeyPoint::from_extremum("right_shoulder", rs),
            ];

            if !all_passed(&conditions) {
                output.rejected.push(RejectedPattern::for_kind(
                    PatternKind::HeadAndShoulders,
                    PatternFamily::HeadAndShoulders,
                    time_range,
                    key_points,
                    conditions,
                ));
                continue;
            }

            // 두 밸리를 잇는 넥라인
            let slope = (rv.price - lv.price) / (rv.index - lv.index) as f64;
            let intercept = lv.price - slope * lv.index as f64;
            let head_height = head.price - lv.price.max(rv.price);
            let target = rv.price - head_height;

            output.accepted.push(PatternRecord::new(
                PatternKind::HeadAndShoulders,
                time_range,
                self.config.confidence,
                key_points,
                conditions,
                PatternGeometry::Neckline {
                    slope,
                    intercept,
                    left_valley: lv.price,
                    right_valley: rv.price,
                    head_height,
                },
                Some(target),
            ));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_conditions_pass_for_textbook_shape() {
        let classifier = HeadShouldersClassifier::with_defaults();
        let conditions = classifier.evaluate(110.0, 120.0, 111.0, 100.0, 101.0);
        assert!(all_passed(&conditions));
        let names: Vec<&str> = conditions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "head_dominance",
                "shoulder_symmetry",
                "neckline_level",
                "head_significance"
            ]
        );
    }

    #[test]
    fn test_asymmetric_shoulders_fail() {
        let classifier = HeadShouldersClassifier::with_defaults();
        let conditions = classifier.evaluate(100.0, 120.0, 110.0, 95.0, 95.0);
        let failed: Vec<&str> = conditions
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(failed, vec!["shoulder_symmetry"]);
    }

    #[test]
    fn test_insignificant_head_fails() {
        let classifier = HeadShouldersClassifier::with_defaults();
        // 머리가 어깨보다 1%만 높음 (기준 2%)
        let conditions = classifier.evaluate(110.0, 111.1, 110.0, 100.0, 100.0);
        assert!(conditions[0].passed);
        assert!(!conditions[3].passed);
    }

    #[test]
    fn test_target_projects_from_right_neckline_valley() {
        use crate::extrema::{Extrema, ExtremumKind, ExtremumPoint};
        use crate::smoothing::SmoothedPrices;
        use crate::test_support::series_from_closes;

        let series = series_from_closes(&vec![105.0; 60]);
        let point = |index: usize, price: f64, kind| ExtremumPoint {
            index,
            date: series.date_at(index).unwrap(),
            price,
            kind,
            strength: 1.0,
        };
        let extrema = Extrema {
            peaks: vec![
                point(10, 110.0, ExtremumKind::Peak),
                point(30, 120.0, ExtremumKind::Peak),
                point(50, 111.0, ExtremumKind::Peak),
            ],
            valleys: vec![
                point(20, 100.0, ExtremumKind::Valley),
                point(40, 101.0, ExtremumKind::Valley),
            ],
            prominence_threshold: 0.5,
        };
        let closes = series.closes();
        let smoothed = SmoothedPrices::from_series(&series, &Default::default());
        let ctx = PatternContext {
            series: &series,
            closes: &closes,
            smoothed: &smoothed,
            extrema: &extrema,
            resistance: &[],
            support: &[],
            mean_price: 105.0,
        };

        let output = HeadShouldersClassifier::with_defaults().classify(&ctx).unwrap();
        assert_eq!(output.accepted.len(), 1);
        // 101 - (120 - max(100, 101))
        assert_eq!(output.accepted[0].price_target, Some(82.0));
    }
}
