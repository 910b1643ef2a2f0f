//! Double Top / Double Bottom 분류기.

use chart_core::DoubleConfig;

use super::{
    all_passed, extreme_between, ClassifierOutput, ConditionResult, KeyPoint, PatternClassifier,
    PatternContext, PatternFamily, PatternGeometry, PatternKind, PatternRecord, RejectedPattern,
    TimeRange,
};
use crate::error::StageResult;
use crate::extrema::ExtremumPoint;

/// 이중 천장/바닥 분류기.
#[derive(Debug, Clone)]
pub struct DoubleExtremumClassifier {
    config: DoubleConfig,
}

impl DoubleExtremumClassifier {
    pub fn new(config: DoubleConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DoubleConfig::default())
    }

    /// 연속된 같은 종류 극값 쌍을 평가합니다.
    ///
    /// `pairs`는 피크(천장) 또는 밸리(바닥), `opposite`는 그 사이에서 찾을
    /// 반대 극값 목록입니다.
    fn scan(
        &self,
        ctx: &PatternContext<'_>,
        kind: PatternKind,
        pairs: &[ExtremumPoint],
        opposite: &[ExtremumPoint],
        output: &mut ClassifierOutput,
    ) -> StageResult<()> {
        let is_top = kind == PatternKind::DoubleTop;

        for pair in pairs.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            let Some(middle) = extreme_between(opposite, first.index, second.index, is_top)
            else {
                continue;
            };

            let price_gap = (first.price - second.price).abs() / first.price;
            let separation = (second.index - first.index) as f64;
            let depth = if is_top {
                let lower_top = first.price.min(second.price);
                (lower_top - middle.price) / lower_top
            } else {
                let higher_bottom = first.price.max(second.price);
                (middle.price - higher_bottom) / higher_bottom
            };

            let conditions = vec![
                ConditionResult::below("price_similarity", price_gap, self.config.tolerance),
                ConditionResult::strictly_between(
                    "separation",
                    separation,
                    self.config.min_separation as f64,
                    self.config.max_separation as f64,
                ),
                ConditionResult::above("intervening_depth", depth, self.config.min_depth),
            ];

            let time_range = TimeRange::new(ctx.series, first.index, second.index)?;
            let (first_label, middle_label, second_label) = if is_top {
                ("first_top", "intervening_valley", "second_top")
            } else {
                ("first_bottom", "intervening_peak", "second_bottom")
            };
            let key_points = vec![
                KeyPoint::from_extremum(first_label, first),
                KeyPoint::from_extremum(middle_label, middle),
                KeyPoint::from_extremum(second_label, second),
            ];

            if !all_passed(&conditions) {
                output.rejected.push(RejectedPattern::for_kind(
                    kind,
                    PatternFamily::DoubleExtremum,
                    time_range,
                    key_points,
                    conditions,
                ));
                continue;
            }

            // 중간 극값을 넥라인으로 한 높이만큼 투영
            let target = if is_top {
                middle.price - (first.price.min(second.price) - middle.price)
            } else {
                middle.price + (middle.price - first.price.max(second.price))
            };

            output.accepted.push(PatternRecord::new(
                kind,
                time_range,
                0.90 - price_gap * 10.0,
                key_points,
                conditions,
                PatternGeometry::DoubleExtremum {
                    first_price: first.price,
                    second_price: second.price,
                    intervening_price: middle.price,
                    price_gap,
                    depth,
                },
                Some(target),
            ));
        }

        Ok(())
    }
}

impl PatternClassifier for DoubleExtremumClassifier {
    fn family(&self) -> PatternFamily {
        PatternFamily::DoubleExtremum
    }

    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput> {
        let mut output = ClassifierOutput::default();
        self.scan(
            ctx,
            PatternKind::DoubleTop,
            &ctx.extrema.peaks,
            &ctx.extrema.valleys,
            &mut output,
        )?;
        self.scan(
            ctx,
            PatternKind::DoubleBottom,
            &ctx.extrema.valleys,
            &ctx.extrema.peaks,
            &mut output,
        )?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrema::{Extrema, ExtremumKind};
    use crate::smoothing::SmoothedPrices;
    use crate::test_support::series_from_closes;

    fn point(series: &chart_core::PriceSeries, index: usize, price: f64, kind: ExtremumKind) -> ExtremumPoint {
        ExtremumPoint {
            index,
            date: series.date_at(index).unwrap(),
            price,
            kind,
            strength: 1.0,
        }
    }

    fn run(peaks: &[(usize, f64)], valleys: &[(usize, f64)]) -> ClassifierOutput {
        let series = series_from_closes(&vec![100.0; 80]);
        let extrema = Extrema {
            peaks: peaks
                .iter()
                .map(|&(i, p)| point(&series, i, p, ExtremumKind::Peak))
                .collect(),
            valleys: valleys
                .iter()
                .map(|&(i, p)| point(&series, i, p, ExtremumKind::Valley))
                .collect(),
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
            mean_price: 100.0,
        };
        DoubleExtremumClassifier::with_defaults().classify(&ctx).unwrap()
    }

    #[test]
    fn test_double_top_accepted() {
        let output = run(&[(10, 120.0), (40, 119.0)], &[(25, 105.0)]);
        assert_eq!(output.accepted.len(), 1);
        let record = &output.accepted[0];
        assert_eq!(record.kind, PatternKind::DoubleTop);
        assert_eq!(record.pattern_id, "DT_0010");
        // 0.90 - (1/120)*10
        assert!((record.base_confidence - (0.90 - 10.0 / 120.0)).abs() < 1e-9);
        // 105 - (119 - 105)
        assert!((record.price_target.unwrap() - 91.0).abs() < 1e-9);
    }

    #[test]
    fn test_double_bottom_too_close_rejected() {
        let output = run(&[(18, 110.0)], &[(15, 100.0), (22, 100.5)]);
        assert!(output.accepted.is_empty());
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].attempted, Some(PatternKind::DoubleBottom));
        assert_eq!(output.rejected[0].failed, vec!["separation".to_string()]);
    }

    #[test]
    fn test_shallow_valley_rejected() {
        let output = run(&[(10, 100.0), (40, 100.5)], &[(25, 99.0)]);
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].failed, vec!["intervening_depth".to_string()]);
    }
}
